//! Pager state and command interpretation for the interactive REPL.
//!
//! The pager behaves like a grid control: it tracks the current offset,
//! length, sort and search, and issues one `PageRequest` per redraw with a
//! fresh echo token.

use pagepipe::{PageLength, PageRequest, SortColumn};

use crate::args::{parse_length, parse_sort_list};
use crate::error::{CliError, CliResult};

/// A parsed REPL command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Page(usize),
    Next,
    Prev,
    First,
    Last,
    Length(PageLength),
    Sort(Vec<SortColumn>),
    Search(Option<String>),
    Window,
    Stats,
    Invalidate,
    Help,
    Clear,
    Exit,
}

/// What the REPL loop must do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Fetch(PageRequest),
    ShowWindow,
    ShowStats,
    Invalidate,
    Help,
    Clear,
    Exit,
}

/// Parse one input line. A leading `/` is optional.
pub fn parse_command(line: &str) -> CliResult<Command> {
    let input = line.trim();
    let input = input.strip_prefix('/').unwrap_or(input);
    if input.is_empty() {
        return Ok(Command::Help);
    }

    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    match cmd {
        "show" | "s" | "refresh" => Ok(Command::Show),
        "page" | "p" => {
            if args.is_empty() {
                return Err(CliError::Usage("/page <number>"));
            }
            match args.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Command::Page(n)),
                _ => Err(CliError::InvalidPage(args.to_string())),
            }
        }
        "next" | "n" => Ok(Command::Next),
        "prev" | "previous" => Ok(Command::Prev),
        "first" => Ok(Command::First),
        "last" => Ok(Command::Last),
        "length" | "len" => {
            if args.is_empty() {
                return Err(CliError::Usage("/length <number|all>"));
            }
            Ok(Command::Length(parse_length(args)?))
        }
        "sort" => Ok(Command::Sort(parse_sort_list(args)?)),
        "search" | "filter" => Ok(Command::Search(
            Some(args.to_string()).filter(|s| !s.is_empty()),
        )),
        "window" | "w" => Ok(Command::Window),
        "stats" => Ok(Command::Stats),
        "invalidate" => Ok(Command::Invalidate),
        "help" | "h" | "?" => Ok(Command::Help),
        "clear" | "cls" => Ok(Command::Clear),
        "exit" | "quit" | "q" => Ok(Command::Exit),
        other => Err(CliError::UnknownCommand(other.to_string())),
    }
}

/// Paging position and sort/filter context.
#[derive(Debug, Clone)]
pub struct Pager {
    start: usize,
    length: PageLength,
    sort: Vec<SortColumn>,
    search: Option<String>,
    params: Vec<(String, String)>,
    echo: u64,
    /// Filtered total from the last page shown.
    total: Option<usize>,
}

impl Pager {
    pub fn new(length: PageLength) -> Self {
        Self {
            start: 0,
            length,
            sort: Vec::new(),
            search: None,
            params: Vec::new(),
            echo: 0,
            total: None,
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn length(&self) -> PageLength {
        self.length
    }

    /// Remember the filtered total reported by the last page.
    pub fn observe_total(&mut self, total_filtered: usize) {
        self.total = Some(total_filtered);
    }

    /// Build the request for the current position with a fresh echo.
    pub fn request(&mut self) -> PageRequest {
        self.echo += 1;
        PageRequest {
            display_start: self.start,
            display_length: self.length,
            echo: self.echo,
            sort: self.sort.clone(),
            search: self.search.clone(),
            params: self.params.clone(),
        }
    }

    /// Apply a command and return what the REPL should do.
    pub fn apply(&mut self, command: Command) -> Action {
        match command {
            Command::Show => {}
            Command::Page(n) => {
                if let PageLength::Rows(len) = self.length {
                    self.start = n.saturating_sub(1).saturating_mul(len);
                }
            }
            Command::Next => {
                if let PageLength::Rows(len) = self.length {
                    let next = self.start.saturating_add(len);
                    if self.total.map_or(true, |total| next < total) {
                        self.start = next;
                    }
                }
            }
            Command::Prev => {
                if let PageLength::Rows(len) = self.length {
                    self.start = self.start.saturating_sub(len);
                }
            }
            Command::First => self.start = 0,
            Command::Last => {
                if let (PageLength::Rows(len), Some(total)) = (self.length, self.total) {
                    self.start = total.saturating_sub(1) / len * len;
                }
            }
            Command::Length(length) => {
                self.length = length;
                self.start = match length {
                    PageLength::Rows(len) => self.start / len * len,
                    PageLength::All => 0,
                };
            }
            Command::Sort(sort) => self.sort = sort,
            Command::Search(search) => {
                self.search = search;
                self.start = 0;
            }
            Command::Window => return Action::ShowWindow,
            Command::Stats => return Action::ShowStats,
            Command::Invalidate => return Action::Invalidate,
            Command::Help => return Action::Help,
            Command::Clear => return Action::Clear,
            Command::Exit => return Action::Exit,
        }
        Action::Fetch(self.request())
    }
}
