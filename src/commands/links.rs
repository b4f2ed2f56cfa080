//! Resource locations embedded in responses
//!
//! Every segment is percent-encoded; multi-segment values (branch names,
//! file paths) keep their `/` separators so they round-trip through the
//! wildcard routes.

use urlencoding::encode;

fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn clone(name: &str) -> String {
    format!("/clone/{}", encode(name))
}

pub fn project(id: &str) -> String {
    format!("/workspace/project/{}", encode(id))
}

pub fn status(project: &str) -> String {
    format!("/git/status/{}", encode(project))
}

pub fn index(project: &str) -> String {
    format!("/git/index/{}", encode(project))
}

pub fn commit(project: &str) -> String {
    format!("/git/commit/{}", encode(project))
}

pub fn commit_rev(project: &str, rev: &str) -> String {
    format!("{}/{}", commit(project), encode_path(rev))
}

pub fn remotes(project: &str) -> String {
    format!("/git/remote/{}", encode(project))
}

pub fn remote(project: &str, remote: &str) -> String {
    format!("{}/{}", remotes(project), encode(remote))
}

pub fn remote_branch(project: &str, remote_name: &str, branch: &str) -> String {
    format!("{}/{}", remote(project, remote_name), encode_path(branch))
}

pub fn file(project: &str, path: &str) -> String {
    format!("/file/{}/{}", encode(project), encode_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_keeps_separators() {
        assert_eq!(
            remote_branch("p1", "origin", "feature/login"),
            "/git/remote/p1/origin/feature/login"
        );
    }

    #[test]
    fn test_segments_are_encoded() {
        assert_eq!(file("p1", "docs/read me.md"), "/file/p1/docs/read%20me.md");
        assert_eq!(remote("p1", "my remote"), "/git/remote/p1/my%20remote");
    }
}
