//! Change events emitted by the task store.

use serde::{Deserialize, Serialize};

/// The kind of write that produced a [`ChangeNotification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl WriteKind {
    /// Classify a SQL statement, returning the write kind and target table.
    ///
    /// Understands SQLite's `OR <action>` conflict clauses, `REPLACE INTO`
    /// and a leading `WITH` clause (the first write verb after it is taken as
    /// the statement). Returns `None` for anything that is not an INSERT,
    /// REPLACE, UPDATE or DELETE.
    pub fn classify(sql: &str) -> Option<(WriteKind, String)> {
        let mut words = sql.split_whitespace();
        let mut verb = words.next()?;
        if verb.eq_ignore_ascii_case("WITH") {
            verb = words.find(|w| is_write_verb(w))?;
        }
        let (kind, table) = match verb.to_ascii_uppercase().as_str() {
            // INSERT [OR <action>] INTO <table> / REPLACE INTO <table>
            "INSERT" | "REPLACE" => (WriteKind::Insert, target_after(&mut words, "INTO")?),
            // UPDATE [OR <action>] <table>
            "UPDATE" => (WriteKind::Update, skip_conflict_clause(&mut words)?),
            // DELETE FROM <table>
            "DELETE" => (WriteKind::Delete, target_after(&mut words, "FROM")?),
            _ => return None,
        };
        let table = table
            .split('(')
            .next()
            .unwrap_or(table)
            .trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']');
        Some((kind, table.to_string()))
    }
}

fn is_write_verb(word: &str) -> bool {
    ["INSERT", "REPLACE", "UPDATE", "DELETE"]
        .iter()
        .any(|verb| word.eq_ignore_ascii_case(verb))
}

/// Next word, skipping an `OR <action>` clause in front of it.
fn skip_conflict_clause<'a>(words: &mut impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let word = words.next()?;
    if word.eq_ignore_ascii_case("OR") {
        words.next()?;
        return words.next();
    }
    Some(word)
}

fn target_after<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    keyword: &str,
) -> Option<&'a str> {
    let word = skip_conflict_clause(words)?;
    if !word.eq_ignore_ascii_case(keyword) {
        return None;
    }
    words.next()
}

/// Lightweight event broadcast after every write to a watched table.
///
/// Subscribers must not rely on the payload beyond "something changed": the
/// state holder answers any notification with a full resynchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub table: String,
    pub kind: WriteKind,
}
