//! Interactive pager over a remote table.
//!
//! Launch with `pagepipe repl --endpoint <url>` to page through a table with
//! the cache in front of it. Type `/help` for available commands, Tab for
//! completion.

use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use tokio::runtime::Handle;

use pagepipe::{PagedResultCache, Transport};

use crate::pager::{parse_command, Action, Pager};
use crate::render::{render_page, render_window};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/show", "Redraw the current page"),
    ("/next", "Next page"),
    ("/prev", "Previous page"),
    ("/first", "First page"),
    ("/last", "Last page"),
    ("/page", "Jump to page N (1-based)"),
    ("/length", "Set page length (number or all)"),
    ("/sort", "Sort by COLUMN[:asc|desc], comma-separated"),
    ("/search", "Filter rows (no argument clears)"),
    ("/window", "Show the cache window"),
    ("/stats", "Show cache hit/miss counters"),
    ("/invalidate", "Drop buffered rows"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct PagerHelper;

impl Completer for PagerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        if input.starts_with("/length ") {
            let args = &input["/length ".len()..];
            let matches: Vec<Pair> = ["10", "25", "50", "100", "all"]
                .iter()
                .filter(|v| v.starts_with(args.trim()))
                .map(|v| Pair {
                    display: v.to_string(),
                    replacement: v.to_string(),
                })
                .collect();
            return Ok(("/length ".len(), matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for PagerHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for PagerHelper {}
impl Validator for PagerHelper {}
impl Helper for PagerHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive pager.
///
/// Blocks the calling thread; `handle` drives the cache's async fetches, so
/// call this from `spawn_blocking` or a plain thread, never from a task.
pub fn run<T: Transport>(
    cache: Arc<PagedResultCache<T>>,
    mut pager: Pager,
    endpoint: &str,
    handle: Handle,
) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mpagepipe v{}\x1b[0m \x1b[90m{endpoint}\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<PagerHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(PagerHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".pagepipe_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    // First page straight away.
    let first = pager.request();
    show_page(&cache, &mut pager, first, &handle);

    let prompt = " \x1b[36mpage>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("  {e}");
                        continue;
                    }
                };

                match pager.apply(command) {
                    Action::Fetch(request) => show_page(&cache, &mut pager, request, &handle),
                    Action::ShowWindow => {
                        let snapshot = handle.block_on(cache.snapshot());
                        eprintln!();
                        for line in render_window(&snapshot, &cache.stats()).lines() {
                            eprintln!("  {line}");
                        }
                        eprintln!();
                    }
                    Action::ShowStats => {
                        let stats = cache.stats();
                        eprintln!(
                            "  {} hits, {} misses, {} failed, {} discarded",
                            stats.hits, stats.misses, stats.failures, stats.discarded
                        );
                    }
                    Action::Invalidate => {
                        handle.block_on(cache.invalidate());
                        eprintln!("  Cache window dropped.");
                    }
                    Action::Help => cmd_help(),
                    Action::Clear => eprint!("\x1b[2J\x1b[H"),
                    Action::Exit => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn show_page<T: Transport>(
    cache: &PagedResultCache<T>,
    pager: &mut Pager,
    request: pagepipe::PageRequest,
    handle: &Handle,
) {
    let before = cache.stats();
    match handle.block_on(cache.resolve(&request)) {
        Ok(page) => {
            pager.observe_total(page.total_filtered);
            let source = if cache.stats().hits > before.hits {
                "cache"
            } else {
                "server"
            };
            eprintln!();
            for line in render_page(&page, request.display_start).lines() {
                eprintln!("  {line}");
            }
            eprintln!("  \x1b[90m(echo {}, from {source})\x1b[0m", page.echo);
            eprintln!();
        }
        Err(e) => {
            eprintln!("  \x1b[31mFetch failed:\x1b[0m {e}");
        }
    }
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completion works for commands and page lengths.");
    eprintln!();
}
