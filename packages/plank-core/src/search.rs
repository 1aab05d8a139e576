/// Item search across boards.
///
/// Query syntax: bare words (all must occur in the item content), "quoted
/// phrases", `-` to negate any term, `#tag` for board tags, `board:`,
/// `container:` / `col:`, `is:done` / `is:open`, and `/regex/`.
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::types::{Board, Container, Item};

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Treat the whole query as one regular expression over item content.
    pub use_regex: bool,
}

/// One matching item, with enough context to render and navigate to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub board_slug: String,
    pub board_title: String,
    pub container_id: String,
    pub container_title: String,
    pub item_id: String,
    pub content: String,
    pub completed: bool,
}

struct Candidate<'a> {
    board: &'a Board,
    container: &'a Container,
    item: &'a Item,
}

#[derive(Debug)]
enum SearchTerm {
    Text(String),
    Tag(String),
    Board(String),
    Container(String),
    IsDone(bool),
    Regex(Regex),
}

#[derive(Debug)]
struct ParsedTerm {
    negate: bool,
    term: SearchTerm,
}

#[derive(Debug)]
pub struct Query {
    terms: Vec<ParsedTerm>,
    regex_mode: Option<Regex>,
    regex_invalid: bool,
    case_sensitive: bool,
}

impl Query {
    pub fn compile(raw_query: &str, options: SearchOptions) -> Self {
        let query = raw_query.trim();
        let mut compiled = Self {
            terms: Vec::new(),
            regex_mode: None,
            regex_invalid: false,
            case_sensitive: options.case_sensitive,
        };
        if query.is_empty() {
            return compiled;
        }

        if options.use_regex {
            match build_regex(query, options.case_sensitive) {
                Some(regex) => compiled.regex_mode = Some(regex),
                None => compiled.regex_invalid = true,
            }
            return compiled;
        }

        compiled.terms = split_query_tokens(query)
            .into_iter()
            .filter_map(|token| parse_token(&token, options.case_sensitive))
            .collect();
        compiled
    }

    /// An empty query matches nothing rather than everything.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.regex_mode.is_none() && !self.regex_invalid
    }

    /// Matching items of one board, in display order.
    pub fn search_board(&self, board: &Board) -> Vec<SearchHit> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for container in board.ordered_containers() {
            for item in board.ordered_items(&container.id) {
                let candidate = Candidate {
                    board,
                    container,
                    item,
                };
                if self.matches(&candidate) {
                    hits.push(SearchHit {
                        board_slug: board.slug.clone(),
                        board_title: board.title.clone(),
                        container_id: container.id.clone(),
                        container_title: container.title.clone(),
                        item_id: item.id.clone(),
                        content: item.content.clone(),
                        completed: item.completed,
                    });
                }
            }
        }
        hits
    }

    fn matches(&self, candidate: &Candidate<'_>) -> bool {
        if self.regex_invalid {
            return false;
        }
        if let Some(regex) = &self.regex_mode {
            return regex.is_match(&candidate.item.content);
        }
        self.terms
            .iter()
            .all(|parsed| self.matches_term(&parsed.term, candidate) != parsed.negate)
    }

    fn matches_term(&self, term: &SearchTerm, candidate: &Candidate<'_>) -> bool {
        match term {
            SearchTerm::Text(value) => {
                contains_text(&candidate.item.content, value, self.case_sensitive)
            }
            SearchTerm::Tag(value) => candidate
                .board
                .tags
                .iter()
                .any(|tag| normalize_tag(&tag.title) == *value),
            SearchTerm::Board(value) => {
                contains_text(&candidate.board.title, value, self.case_sensitive)
                    || candidate.board.slug == *value
            }
            SearchTerm::Container(value) => {
                contains_text(&candidate.container.title, value, self.case_sensitive)
            }
            SearchTerm::IsDone(done) => candidate.item.completed == *done,
            SearchTerm::Regex(regex) => regex.is_match(&candidate.item.content),
        }
    }
}

/// Search every board, boards in the order given.
pub fn search_boards<'a>(boards: impl IntoIterator<Item = &'a Board>, query: &Query) -> Vec<SearchHit> {
    boards
        .into_iter()
        .flat_map(|board| query.search_board(board))
        .collect()
}

fn split_query_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                if !in_quotes && !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_token(raw_token: &str, case_sensitive: bool) -> Option<ParsedTerm> {
    let token = raw_token.trim();
    let (negate, token) = match token.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, token),
    };
    if token.is_empty() {
        return None;
    }

    if let Some(tag) = token.strip_prefix('#') {
        return (!tag.is_empty()).then(|| ParsedTerm {
            negate,
            term: SearchTerm::Tag(normalize_tag(tag)),
        });
    }

    if token.len() > 2 && token.starts_with('/') && token.ends_with('/') {
        if let Some(regex) = build_regex(&token[1..token.len() - 1], case_sensitive) {
            return Some(ParsedTerm {
                negate,
                term: SearchTerm::Regex(regex),
            });
        }
    }

    if let Some((key, value)) = token.split_once(':') {
        let value = value.trim();
        let term = match key.to_ascii_lowercase().as_str() {
            "is" => parse_is_term(value),
            "board" => Some(SearchTerm::Board(normalize_case(value, case_sensitive))),
            "container" | "col" | "column" => {
                Some(SearchTerm::Container(normalize_case(value, case_sensitive)))
            }
            "tag" => Some(SearchTerm::Tag(normalize_tag(value))),
            _ => None,
        };
        if value.is_empty() {
            return None;
        }
        if let Some(term) = term {
            return Some(ParsedTerm { negate, term });
        }
    }

    Some(ParsedTerm {
        negate,
        term: SearchTerm::Text(normalize_case(token, case_sensitive)),
    })
}

fn parse_is_term(value: &str) -> Option<SearchTerm> {
    match value.to_ascii_lowercase().as_str() {
        "open" | "todo" | "unchecked" => Some(SearchTerm::IsDone(false)),
        "done" | "checked" | "completed" => Some(SearchTerm::IsDone(true)),
        _ => None,
    }
}

fn build_regex(pattern: &str, case_sensitive: bool) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .ok()
}

/// Lowercase, NFD-decompose and strip combining marks, so "cafe" finds "Café".
fn normalize_for_search(value: &str) -> String {
    value
        .to_lowercase()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

fn normalize_case(value: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        value.to_string()
    } else {
        normalize_for_search(value)
    }
}

fn normalize_tag(value: &str) -> String {
    normalize_for_search(value.trim().trim_start_matches('#').trim_matches('"'))
}

fn contains_text(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        haystack.contains(needle)
    } else {
        normalize_for_search(haystack).contains(needle)
    }
}
