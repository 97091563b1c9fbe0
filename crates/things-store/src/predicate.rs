//! Composable `WHERE` fragments for thing listings.
//!
//! Every predicate references the `things` table through the `th` alias and
//! renders with bound parameters only; user input never becomes SQL text.

use sqlx::{QueryBuilder, Sqlite};
use things_core::{metadata, Metadata, ThingsResult};

/// A filter over `things th`. `Always` is the identity for [`Predicate::and`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Always,
    /// `th.name LIKE pattern`, with the pattern already escaped.
    NameLike { pattern: String },
    /// Stored metadata contains the encoded document.
    MetadataContains { document: String },
    /// Conjunction of two or more predicates.
    All(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction, flattening nested `All` and dropping `Always`.
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Always, p) | (p, Predicate::Always) => p,
            (Predicate::All(mut left), Predicate::All(right)) => {
                left.extend(right);
                Predicate::All(left)
            }
            (Predicate::All(mut left), p) => {
                left.push(p);
                Predicate::All(left)
            }
            (p, Predicate::All(mut right)) => {
                right.insert(0, p);
                Predicate::All(right)
            }
            (left, right) => Predicate::All(vec![left, right]),
        }
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Appends the fragment and its bindings to `builder`.
    pub fn push_to(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Predicate::Always => {
                builder.push("1 = 1");
            }
            Predicate::NameLike { pattern } => {
                builder.push("th.name LIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" ESCAPE '\\'");
            }
            Predicate::MetadataContains { document } => push_containment(builder, document),
            Predicate::All(parts) if parts.is_empty() => {
                builder.push("1 = 1");
            }
            Predicate::All(parts) => {
                builder.push("(");
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        builder.push(" AND ");
                    }
                    part.push_to(builder);
                }
                builder.push(")");
            }
        }
    }
}

/// Case-insensitive (ASCII) substring match on the name; neutral when empty.
#[must_use]
pub fn name_filter(name: &str) -> Predicate {
    if name.is_empty() {
        return Predicate::Always;
    }
    Predicate::NameLike {
        pattern: format!("%{}%", escape_like(name)),
    }
}

/// Containment of `filter` in the stored metadata; neutral when empty.
pub fn metadata_filter(filter: &Metadata) -> ThingsResult<Predicate> {
    if filter.is_empty() {
        return Ok(Predicate::Always);
    }
    Ok(Predicate::MetadataContains {
        document: metadata::encode(filter)?,
    })
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// Every member of every object in the filter (`json_tree` rows whose parent
// row is an object) needs a stored member at the same `fullkey` with the same
// key and JSON type. Objects recurse through their own members; anything else
// must also match by value, so arrays compare whole. Members are paired by
// `fullkey` text rather than resolved as paths because SQLite does not escape
// quotes inside path labels.
fn push_containment(builder: &mut QueryBuilder<'_, Sqlite>, document: &str) {
    builder.push("NOT EXISTS (SELECT 1 FROM json_tree(");
    builder.push_bind(document.to_owned());
    builder.push(") AS f JOIN json_tree(");
    builder.push_bind(document.to_owned());
    builder.push(
        ") AS fp ON fp.id = f.parent \
         WHERE fp.type = 'object' AND NOT EXISTS (\
         SELECT 1 FROM json_tree(th.metadata) AS s \
         WHERE s.fullkey = f.fullkey AND s.key = f.key AND s.type = f.type \
         AND (f.type = 'object' OR s.value IS f.value)))",
    );
}
