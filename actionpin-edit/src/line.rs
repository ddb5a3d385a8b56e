use actionpin_types::ActionCall;

/// Rewrite one `uses:` line to point at `sha`.
///
/// Only the reference after `@` and the trailing comment change. Indentation,
/// the list marker, the key and any quoting are kept byte-for-byte. With an
/// `annotation` the existing comment (if any) is replaced by
/// `# <annotation>`; without one the rest of the line is left alone.
///
/// Returns `None` when the call's token cannot be located in `raw_line`.
pub fn rewrite_uses_line(
    call: &ActionCall,
    sha: &str,
    annotation: Option<&str>,
    two_space_comments: bool,
) -> Option<String> {
    let line = call.raw_line.as_str();
    let key = line.find("uses:")?;
    let target = call.target();
    let target_start = key + line[key..].find(target.as_str())?;
    let target_end = target_start + target.len();

    let after_target = &line[target_end..];
    let (ref_start, ref_end) = if after_target.starts_with('@') {
        let reference = &after_target[1..];
        let tail = reference.strip_prefix(call.reference.as_str())?;
        let ends_cleanly = tail
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || matches!(c, '"' | '\''));
        if !ends_cleanly {
            return None;
        }
        (target_end + 1, target_end + 1 + call.reference.len())
    } else if call.reference.is_empty() {
        (target_end, target_end)
    } else {
        return None;
    };

    let at = if ref_start == target_end { "@" } else { "" };
    let rest = &line[ref_end..];

    let mut out = String::with_capacity(line.len() + sha.len() + 16);
    out.push_str(&line[..ref_start]);
    out.push_str(at);
    out.push_str(sha);

    match annotation {
        Some(annotation) => {
            let body = match comment_start(rest) {
                Some(idx) => &rest[..idx],
                None => rest,
            };
            out.push_str(body.trim_end());
            out.push_str(if two_space_comments { "  # " } else { " # " });
            out.push_str(annotation);
        }
        None => out.push_str(rest),
    }

    Some(out)
}

/// Byte offset of a YAML comment: `#` at the start or after whitespace.
fn comment_start(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    bytes
        .iter()
        .enumerate()
        .find(|&(i, &b)| b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()))
        .map(|(i, _)| i)
}
