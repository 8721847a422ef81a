//! bootstrap::patch_file
//!
//! Parsing of downstream patch files.
//!
//! A dist-git patch file is one of three shapes:
//!
//! - a `git format-patch` mail (mbox `From <sha>` line, `From:` /
//!   `Date:` / `Subject:` headers, description, `---`, diff)
//! - several such mails concatenated (a `git am` sequence); each mail
//!   becomes one segment
//! - a plain unified diff, possibly with leading `# ` comment lines as
//!   written by the patch engine
//!
//! Each segment keeps the original author identity so the bootstrapper
//! can attribute the recreated commits to the people who wrote the
//! patches, not to itself.

use chrono::DateTime;

use crate::git::Identity;

/// One commit-equivalent unit of a patch file.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSegment {
    /// Subject line, `[PATCH n/m]` prefix stripped.
    pub subject: String,
    /// Description body between the headers and the diff.
    pub body: String,
    /// Original author, when the file carries one.
    pub author: Option<Identity>,
    /// The unified diff text.
    pub diff: String,
}

/// Split a patch file into its segments, in file order.
///
/// A file without mbox separators parses as a single segment. Files
/// with no recognizable diff content yield no segments.
pub fn parse(text: &str) -> Vec<PatchSegment> {
    let mut segments = Vec::new();

    let mut current = String::new();
    for line in text.lines() {
        if is_mbox_separator(line) && !current.trim().is_empty() {
            if let Some(segment) = parse_segment(&current) {
                segments.push(segment);
            }
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if let Some(segment) = parse_segment(&current) {
        segments.push(segment);
    }

    segments
}

/// `From <40-hex-sha> <date>` - the boundary git format-patch writes.
fn is_mbox_separator(line: &str) -> bool {
    line.strip_prefix("From ").is_some_and(|rest| {
        let sha: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
        sha.len() == 40 && sha.chars().all(|c| c.is_ascii_hexdigit())
    })
}

fn parse_segment(text: &str) -> Option<PatchSegment> {
    let lines: Vec<&str> = text.lines().collect();

    let diff_start = lines
        .iter()
        .position(|l| l.starts_with("diff --git") || l.starts_with("--- "))?;

    // Everything between the `---` scissors line and the diff is the
    // diffstat, not description.
    let header_end = lines[..diff_start]
        .iter()
        .position(|l| l.trim() == "---")
        .unwrap_or(diff_start);

    let mut subject = String::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut author: Option<Identity> = None;
    let mut date: Option<DateTime<chrono::Utc>> = None;

    for line in &lines[..header_end] {
        if let Some(value) = line.strip_prefix("From: ") {
            author = parse_author(value);
        } else if let Some(value) = line.strip_prefix("Date: ") {
            date = DateTime::parse_from_rfc2822(value.trim())
                .ok()
                .map(|d| d.to_utc());
        } else if let Some(value) = line.strip_prefix("Subject: ") {
            subject = strip_patch_prefix(value).to_string();
        } else if let Some(value) = line.strip_prefix("# Author: ") {
            author = parse_author(value);
        } else if let Some(value) = line.strip_prefix("# ") {
            // Engine-written header comments: first one is the subject.
            if subject.is_empty() {
                subject = value.to_string();
            }
        } else if is_mbox_separator(line) || line.trim() == "#" {
            continue;
        } else if !line.trim().is_empty() {
            body_lines.push(line);
        }
    }

    // Trim the git version signature off the diff tail.
    let mut diff_lines: Vec<&str> = lines[diff_start..].to_vec();
    if let Some(sig) = diff_lines.iter().rposition(|l| l.trim_end() == "--") {
        diff_lines.truncate(sig);
    }

    let mut diff = diff_lines.join("\n");
    diff.push('\n');

    if let (Some(identity), Some(when)) = (&mut author, date) {
        identity.time = Some(when);
    }

    Some(PatchSegment {
        subject,
        body: body_lines.join("\n"),
        author,
        diff,
    })
}

/// Parse `Name <email>` into an identity.
fn parse_author(value: &str) -> Option<Identity> {
    let (name, rest) = value.split_once('<')?;
    let email = rest.strip_suffix('>')?;
    let name = name.trim();
    if name.is_empty() || email.is_empty() {
        return None;
    }
    Some(Identity::new(name, email.trim()))
}

/// Strip `[PATCH]`, `[PATCH 2/5]` and similar prefixes off a subject.
fn strip_patch_prefix(subject: &str) -> &str {
    let subject = subject.trim();
    match subject.strip_prefix('[') {
        Some(rest) => match rest.split_once(']') {
            Some((_, tail)) => tail.trim_start(),
            None => subject,
        },
        None => subject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIL: &str = "\
From 1234567890abcdef1234567890abcdef12345678 Mon Sep 17 00:00:00 2001
From: Jane Doe <jane@example.com>
Date: Tue, 3 Mar 2026 10:00:00 +0100
Subject: [PATCH] Fix the frobnicator

The frobnicator was off by one.
---
 src/frob.c | 2 +-
 1 file changed, 1 insertion(+), 1 deletion(-)

diff --git a/src/frob.c b/src/frob.c
index 1111111..2222222 100644
--- a/src/frob.c
+++ b/src/frob.c
@@ -1 +1 @@
-int frob = 0;
+int frob = 1;
--
2.43.0
";

    #[test]
    fn parses_format_patch_mail() {
        let segments = parse(MAIL);
        assert_eq!(segments.len(), 1);

        let seg = &segments[0];
        assert_eq!(seg.subject, "Fix the frobnicator");
        assert_eq!(seg.body, "The frobnicator was off by one.");

        let author = seg.author.as_ref().unwrap();
        assert_eq!(author.name, "Jane Doe");
        assert_eq!(author.email, "jane@example.com");
        assert!(author.time.is_some());

        assert!(seg.diff.starts_with("diff --git"));
        assert!(!seg.diff.contains("2.43.0"));
    }

    #[test]
    fn splits_concatenated_mails() {
        let two = format!("{MAIL}{MAIL}");
        let segments = parse(&two);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].subject, segments[1].subject);
    }

    #[test]
    fn parses_plain_diff() {
        let text = "\
--- a/file.txt
+++ b/file.txt
@@ -1 +1 @@
-old
+new
";
        let segments = parse(text);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].author.is_none());
        assert!(segments[0].subject.is_empty());
        assert!(segments[0].diff.contains("+new"));
    }

    #[test]
    fn parses_engine_comment_header() {
        let text = "\
# Fix the frobnicator
# Author: Jane Doe <jane@example.com>

diff --git a/f b/f
index 1111111..2222222 100644
--- a/f
+++ b/f
@@ -1 +1 @@
-a
+b
";
        let segments = parse(text);
        assert_eq!(segments[0].subject, "Fix the frobnicator");
        assert_eq!(segments[0].author.as_ref().unwrap().name, "Jane Doe");
    }

    #[test]
    fn no_diff_means_no_segment() {
        assert!(parse("just some text\n").is_empty());
    }

    #[test]
    fn subject_prefix_variants() {
        assert_eq!(strip_patch_prefix("[PATCH] x"), "x");
        assert_eq!(strip_patch_prefix("[PATCH 2/5] x"), "x");
        assert_eq!(strip_patch_prefix("x"), "x");
    }
}
