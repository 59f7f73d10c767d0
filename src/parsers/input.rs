use memchr::memchr_iter;

/// Split a link list into one link per line, dropping blank lines and surrounding whitespace.
pub fn parse_link_list(input: &str) -> Vec<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 64);
    let mut start = 0usize;
    for nl in memchr_iter(b'\n', bytes) {
        push_line(&input[start..nl], &mut out);
        start = nl + 1;
    }
    if start < bytes.len() {
        push_line(&input[start..], &mut out);
    }
    out
}

fn push_line(line: &str, out: &mut Vec<String>) {
    let line = line.trim();
    if !line.is_empty() {
        out.push(line.to_string());
    }
}
