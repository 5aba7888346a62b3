//! Low-level text helpers: truncation, top-level splitting and clause
//! location.
//!
//! "Top level" means outside any parenthesised group and outside quoted
//! literals. The scanners here understand `'…'`, `"…"` and `` `…` `` quoting
//! (with backslash escapes inside `'…'` and `"…"`) but nothing else about
//! SQL. Comments must be removed with [`strip_comments`] first.

use std::{borrow::Cow, iter::Peekable, str::Chars};

use regex::{Match, Regex};

// ─── Truncation ──────────────────────────────────────────────────────────────

/// Cut `s` to at most `max` characters, on a character boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((idx, _)) => s[..idx].to_owned(),
    None => s.to_owned(),
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// Remove `-- …` and `/* … */` comments that are not inside a quoted literal.
/// A line comment keeps its newline and a block comment becomes one space,
/// so the tokens on either side stay apart.
pub(crate) fn strip_comments(sql: &str) -> Cow<'_, str> {
  if !sql.contains("--") && !sql.contains("/*") {
    return Cow::Borrowed(sql);
  }

  let mut out = String::with_capacity(sql.len());
  let mut chars = sql.chars().peekable();
  let mut quote: Option<char> = None;
  while let Some(c) = chars.next() {
    if let Some(q) = quote {
      out.push(c);
      if c == '\\' && q != '`' {
        if let Some(escaped) = chars.next() {
          out.push(escaped);
        }
      } else if c == q {
        quote = None;
      }
      continue;
    }

    match (c, chars.peek()) {
      ('-', Some(&'-')) => {
        if skip_line(&mut chars) {
          out.push('\n');
        }
      }
      ('/', Some(&'*')) => {
        chars.next();
        skip_block(&mut chars);
        out.push(' ');
      }
      ('\'' | '"' | '`', _) => {
        quote = Some(c);
        out.push(c);
      }
      _ => out.push(c),
    }
  }
  Cow::Owned(out)
}

/// Consume through the end of the line. `true` if a newline was found.
fn skip_line(chars: &mut Peekable<Chars<'_>>) -> bool {
  chars.any(|c| c == '\n')
}

/// Consume through the closing `*/`, or to the end of input.
fn skip_block(chars: &mut Peekable<Chars<'_>>) {
  let mut prev = None;
  for c in chars.by_ref() {
    if prev == Some('*') && c == '/' {
      return;
    }
    prev = Some(c);
  }
}

// ─── Depth tracking ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Nesting {
  depth:   i32,
  quote:   Option<char>,
  escaped: bool,
}

impl Nesting {
  fn step(&mut self, c: char) {
    if self.escaped {
      self.escaped = false;
      return;
    }
    match (self.quote, c) {
      (Some(q), '\\') if q != '`' => self.escaped = true,
      (Some(q), c) if c == q => self.quote = None,
      (Some(_), _) => {}
      (None, '\'' | '"' | '`') => self.quote = Some(c),
      (None, '(') => self.depth += 1,
      (None, ')') => self.depth -= 1,
      (None, _) => {}
    }
  }

  fn feed(&mut self, s: &str) {
    for c in s.chars() {
      self.step(c);
    }
  }

  fn at_top(&self) -> bool { self.depth <= 0 && self.quote.is_none() }
}

/// Split `s` on commas at the top level. Pieces are trimmed; empty pieces
/// are dropped.
pub(crate) fn split_top_level(s: &str) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut nesting = Nesting::default();
  let mut start = 0usize;
  for (i, c) in s.char_indices() {
    if c == ',' && nesting.at_top() {
      parts.push(&s[start..i]);
      start = i + 1;
    } else {
      nesting.step(c);
    }
  }
  parts.push(&s[start..]);
  parts
    .into_iter()
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .collect()
}

/// Byte index of the `)` that closes the `(` at byte index `open`.
pub(crate) fn closing_paren(text: &str, open: usize) -> Option<usize> {
  let mut nesting = Nesting::default();
  for (i, c) in text[open..].char_indices() {
    nesting.step(c);
    if i > 0 && nesting.depth == 0 && nesting.quote.is_none() {
      return Some(open + i);
    }
  }
  None
}

/// Byte index of the first `)` that closes a group `text` did not open.
fn enclosing_close(text: &str) -> Option<usize> {
  let mut nesting = Nesting::default();
  for (i, c) in text.char_indices() {
    nesting.step(c);
    if nesting.depth < 0 {
      return Some(i);
    }
  }
  None
}

fn first_match<'t>(
  text: &'t str,
  re: &Regex,
  accept: impl Fn(&Nesting) -> bool,
) -> Option<Match<'t>> {
  let mut nesting = Nesting::default();
  let mut scanned = 0usize;
  for m in re.find_iter(text) {
    nesting.feed(&text[scanned..m.start()]);
    scanned = m.start();
    if accept(&nesting) {
      return Some(m);
    }
  }
  None
}

/// The first match of `re` in `text` that lies at the top level.
pub(crate) fn first_top_level<'t>(
  text: &'t str,
  re: &Regex,
) -> Option<Match<'t>> {
  first_match(text, re, Nesting::at_top)
}

/// The body of the clause introduced by the first top-level match of `head`,
/// ending just before the first top-level match of `end` (or at the end of
/// `text`). Trimmed.
pub(crate) fn clause_body<'t>(
  text: &'t str,
  head: &Regex,
  end: &Regex,
) -> Option<&'t str> {
  let start = first_top_level(text, head)?.end();
  let rest = &text[start..];
  let stop = first_top_level(rest, end).map_or(rest.len(), |m| m.start());
  Some(rest[..stop].trim())
}

/// Like [`clause_body`], but `head` may sit at any depth outside quotes. The
/// body also ends where the group holding `head` closes.
pub(crate) fn nested_clause_body<'t>(
  text: &'t str,
  head: &Regex,
  end: &Regex,
) -> Option<&'t str> {
  let start = first_match(text, head, |n| n.quote.is_none())?.end();
  let rest = &text[start..];
  let rest = &rest[..enclosing_close(rest).unwrap_or(rest.len())];
  let stop = first_top_level(rest, end).map_or(rest.len(), |m| m.start());
  Some(rest[..stop].trim())
}
