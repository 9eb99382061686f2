use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub scope: String,
    pub entries: Vec<String>,
}

/// Group `"scope:entry"` strings by scope.
///
/// Groups come out sorted by scope, entries keep the order they were first
/// seen in. The entry is the segment between the first and second `:`, so
/// `"fs:read:tmp"` is scope `fs`, entry `read`. A string without `:` creates
/// its scope with no entry.
pub fn group_permissions<S: AsRef<str>>(permissions: &[S]) -> Vec<PermissionGroup> {
    let mut groups: Vec<PermissionGroup> = Vec::new();

    for permission in permissions {
        let permission = permission.as_ref();
        let mut segments = permission.split(':');
        let scope = segments.next().unwrap_or_default();
        let entry = segments.next();

        let index = match groups.iter().position(|g| g.scope == scope) {
            Some(index) => index,
            None => {
                groups.push(PermissionGroup {
                    scope: scope.to_string(),
                    entries: Vec::new(),
                });
                groups.len() - 1
            }
        };
        if let Some(entry) = entry {
            groups[index].entries.push(entry.to_string());
        }
    }

    groups.sort_by(|a, b| locale_compare(&a.scope, &b.scope));
    groups
}

/// Dictionary order close to an English collator: case-insensitive first,
/// lowercase before uppercase when the letters tie.
///
/// Only ASCII letters and digits follow collator rules. Accented letters and
/// punctuation compare by code point after lowercasing, so `"é"` sorts after
/// `"f"` where a Unicode collator would put it before.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if folded != Ordering::Equal {
        return folded;
    }

    for (x, y) in a.chars().zip(b.chars()) {
        match (x.is_lowercase(), y.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    a.cmp(b)
}
