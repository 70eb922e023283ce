//! Directory Service
//!
//! Owns the user list, including the tolerant bulk import used to paste
//! rows out of a spreadsheet.

use log::{debug, info};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{new_id, User, UserId};

/// Name placeholder. Rows that resolve to it are dropped.
pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_EMPLOYEE_ID: &str = "N/A";
pub const UNASSIGNED: &str = "Unassigned";

/// Fields of a user entered by hand
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub employee_id: String,
    pub department: String,
    pub project_group: String,
}

/// Builds a user with a fresh id and a placeholder avatar
pub fn add_user(fields: NewUser) -> User {
    User {
        id: new_id("u"),
        name: fields.name,
        avatar: placeholder_avatar(),
        employee_id: fields.employee_id,
        department: fields.department,
        project_group: fields.project_group,
    }
}

fn placeholder_avatar() -> String {
    let seed = Uuid::new_v4().simple().to_string();
    format!("https://picsum.photos/seed/{}/100/100", &seed[..12])
}

/// Why an import row was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    EmptyName,
    PlaceholderName,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::EmptyName => write!(f, "missing name"),
            DropReason::PlaceholderName => write!(f, "name is the '{}' placeholder", UNKNOWN_NAME),
        }
    }
}

/// A row that did not produce a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// 1-based line number within the pasted text
    pub line: usize,
    pub content: String,
    pub reason: DropReason,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub users: Vec<User>,
    /// Number of rows seen, imported or not
    pub total_rows: usize,
    pub dropped: Vec<DroppedRow>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.users.len()
    }

    /// Human-readable count, e.g. "2 of 3 rows imported"
    pub fn summary(&self) -> String {
        format!("{} of {} rows imported", self.imported(), self.total_rows)
    }
}

/// Parses pasted rows of `name, employee id, department, project group`
///
/// Both `,` and the full-width `，` separate fields. Missing fields fall back
/// to placeholders. Rows without a usable name are skipped and reported.
/// Malformed input never fails the import.
pub fn bulk_import(text: &str) -> ImportReport {
    let mut report = ImportReport::default();
    let text = text.trim();
    if text.is_empty() {
        return report;
    }

    for (index, line) in text.lines().enumerate() {
        report.total_rows += 1;
        let mut fields = line.split([',', '，']).map(str::trim);
        let mut next_field = |fallback: &'static str| {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        let name = next_field("");
        let employee_id = next_field(UNKNOWN_EMPLOYEE_ID);
        let department = next_field(UNASSIGNED);
        let project_group = next_field(UNASSIGNED);

        let dropped = if name.is_empty() {
            Some(DropReason::EmptyName)
        } else if name == UNKNOWN_NAME {
            Some(DropReason::PlaceholderName)
        } else {
            None
        };

        if let Some(reason) = dropped {
            debug!("Dropping import row {}: {}", index + 1, reason);
            report.dropped.push(DroppedRow {
                line: index + 1,
                content: line.to_string(),
                reason,
            });
            continue;
        }

        report.users.push(add_user(NewUser {
            name,
            employee_id,
            department,
            project_group,
        }));
    }

    info!("Bulk import: {}", report.summary());
    report
}

/// Actions accepted by the user collection reducer
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryAction {
    Add(User),
    AddMany(Vec<User>),
    Remove(UserId),
}

/// Reduces the user collection, returning the new collection
///
/// `AddMany` is all-or-nothing: one colliding id rejects the batch.
pub fn reduce(users: &[User], action: DirectoryAction) -> CoreResult<Vec<User>> {
    match action {
        DirectoryAction::Add(user) => reduce(users, DirectoryAction::AddMany(vec![user])),
        DirectoryAction::AddMany(batch) => {
            let mut next = users.to_vec();
            for user in batch {
                if next.iter().any(|u| u.id == user.id) {
                    return Err(CoreError::duplicate("user", &user.id));
                }
                next.push(user);
            }
            Ok(next)
        }
        DirectoryAction::Remove(id) => remove_user(users, &id),
    }
}

/// Removes a user; comments and assignments that mention them are left alone
pub fn remove_user(users: &[User], id: &str) -> CoreResult<Vec<User>> {
    if !users.iter().any(|u| u.id == id) {
        return Err(CoreError::not_found("user", id));
    }
    Ok(users.iter().filter(|u| u.id != id).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(report: &ImportReport) -> Vec<&str> {
        report.users.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_import_mixed_commas() {
        let report = bulk_import("张三,RD-1001,研发部,支付平台\n李四，PM-2002，产品部，增长组");
        assert_eq!(names(&report), vec!["张三", "李四"]);
        assert_eq!(report.users[1].employee_id, "PM-2002");
        assert_eq!(report.users[1].department, "产品部");
        assert_eq!(report.users[1].project_group, "增长组");
        assert_eq!(report.summary(), "2 of 2 rows imported");
    }

    #[test]
    fn test_import_drops_empty_name() {
        let report = bulk_import("  ,X,Y,Z");
        assert!(report.users.is_empty());
        assert_eq!(report.total_rows, 1);
        assert_eq!(report.dropped[0].reason, DropReason::EmptyName);
        assert_eq!(report.summary(), "0 of 1 rows imported");
    }

    #[test]
    fn test_import_fills_missing_fields() {
        let report = bulk_import(" 王五 , , 交付部");
        assert_eq!(report.users.len(), 1);
        let user = &report.users[0];
        assert_eq!(user.name, "王五");
        assert_eq!(user.employee_id, UNKNOWN_EMPLOYEE_ID);
        assert_eq!(user.department, "交付部");
        assert_eq!(user.project_group, UNASSIGNED);
        assert!(user.avatar.starts_with("https://picsum.photos/seed/"));
    }

    #[test]
    fn test_import_drops_placeholder_and_blank_lines() {
        let report = bulk_import("Unknown,RD-1\n\n赵六,RD-2,研发部,核心平台组\r\n");
        assert_eq!(names(&report), vec!["赵六"]);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.dropped.len(), 2);
        assert_eq!(report.dropped[0].line, 1);
        assert_eq!(report.dropped[0].reason, DropReason::PlaceholderName);
        assert_eq!(report.dropped[1].line, 2);
        assert_eq!(report.users[0].project_group, "核心平台组");
    }

    #[test]
    fn test_import_ignores_extra_fields() {
        let report = bulk_import("a,b,c,d,e,f");
        assert_eq!(report.users[0].project_group, "d");
    }

    #[test]
    fn test_import_empty_text() {
        let report = bulk_import("   \n ");
        assert_eq!(report.total_rows, 0);
        assert!(report.users.is_empty());
    }

    #[test]
    fn test_reduce_add_and_remove() {
        let alice = add_user(NewUser {
            name: "Alex Engineer".to_string(),
            ..Default::default()
        });
        let users = reduce(&[], DirectoryAction::Add(alice.clone())).unwrap();
        assert_eq!(users.len(), 1);

        let dup = reduce(&users, DirectoryAction::Add(alice.clone()));
        assert!(matches!(dup, Err(CoreError::DuplicateId { .. })));

        let users = reduce(&users, DirectoryAction::Remove(alice.id.clone())).unwrap();
        assert!(users.is_empty());

        let missing = reduce(&users, DirectoryAction::Remove(alice.id));
        assert!(matches!(missing, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_add_many_is_all_or_nothing() {
        let a = add_user(NewUser::default());
        let users = vec![a.clone()];
        let b = add_user(NewUser::default());
        let result = reduce(&users, DirectoryAction::AddMany(vec![b, a]));
        assert!(result.is_err());
        assert_eq!(users.len(), 1);
    }
}
