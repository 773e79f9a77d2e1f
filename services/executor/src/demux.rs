/// C2 Log Demuxer. `bollard` already parses the Docker multiplexed-stream
/// 8-byte frame header (stream type + big-endian `u32` size) into
/// `LogOutput::{StdOut,StdErr}` frames when attaching to a container's
/// log stream — see DESIGN.md for why that low-level framing is not
/// reimplemented here. This function performs exactly the remaining,
/// independently testable step: trim one trailing `\n`, split on `\n`,
/// and drop empty segments, in order, matching
/// `xcutr-service/internal/infrastructure/docker/container/container_repository.go`'s
/// `GetLogs` goroutine (`bytes.TrimRight(data, "\n")` then
/// `bytes.SplitSeq(data, []byte("\n"))`, skipping empty segments).
///
/// The stream identifier (stdout vs. stderr) is intentionally ignored,
/// matching the original's behavior of merging both into one ordered
/// channel.
pub fn split_frame(frame: &[u8]) -> Vec<String> {
    let trimmed = trim_trailing_newline(frame);
    trimmed
        .split(|&b| b == b'\n')
        .filter(|segment| !segment.is_empty())
        .map(|segment| String::from_utf8_lossy(segment).into_owned())
        .collect()
}

fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && data[end - 1] == b'\n' {
        end -= 1;
    }
    &data[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_lines_and_drops_empties() {
        let lines = split_frame(b"line one\nline two\n\nline three\n");
        assert_eq!(lines, vec!["line one", "line two", "line three"]);
    }

    #[test]
    fn trims_only_trailing_newlines_not_interior_ones() {
        let lines = split_frame(b"a\n\n\nb\n\n\n");
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn handles_frame_with_no_trailing_newline() {
        let lines = split_frame(b"no newline at all");
        assert_eq!(lines, vec!["no newline at all"]);
    }

    #[test]
    fn empty_frame_yields_no_lines() {
        assert!(split_frame(b"").is_empty());
        assert!(split_frame(b"\n\n\n").is_empty());
    }

    #[test]
    fn preserves_line_order() {
        let lines = split_frame(b"1\n2\n3\n4\n5\n");
        assert_eq!(lines, vec!["1", "2", "3", "4", "5"]);
    }
}
