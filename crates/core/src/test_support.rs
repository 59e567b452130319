use commit_insights_developer_platforms::models::{
    Author, ChangeKind, CommitRecord, Committer, FileChange,
};

pub(crate) fn commit(hash: &str, author: &str, time: &str, files: &[(&str, &str)]) -> CommitRecord {
    let email = format!("{}@example.com", author.to_lowercase());
    CommitRecord {
        hash: hash.to_string(),
        parent_hashes: vec![],
        ref_names: vec![],
        author: Author {
            name: author.to_string(),
            email: email.clone(),
            username: author.to_lowercase(),
        },
        committer: Committer {
            name: author.to_string(),
            email,
        },
        author_time: time.to_string(),
        commit_time: time.to_string(),
        title: format!("change by {}", author),
        body: String::new(),
        changes: files
            .iter()
            .map(|(status, path)| FileChange {
                path: path.to_string(),
                kind: ChangeKind::from_status_code(status),
            })
            .collect(),
    }
}

/// Commit A (Alice adds README.md) followed by commit B (Bob modifies main.go
/// and deletes util.go).
pub(crate) fn two_commit_history() -> Vec<CommitRecord> {
    vec![
        commit("aaa111", "Alice", "1694299436", &[("A", "README.md")]),
        commit(
            "bbb222",
            "Bob",
            "1694299500",
            &[("M", "main.go"), ("D", "util.go")],
        ),
    ]
}
