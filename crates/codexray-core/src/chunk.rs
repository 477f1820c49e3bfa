//! Line-aligned splitting of oversized inputs.

/// Splits `text` into newline-aligned chunks of at most `max_size` chars.
///
/// Lines are accumulated greedily; a line that would push the current chunk
/// past the budget starts a new chunk. A single line longer than the budget
/// becomes its own oversized chunk. Blank lines never open or close a chunk,
/// they stay attached to the chunk being built. Joining the result with `\n`
/// reproduces `text` exactly, and no chunk is empty.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut started = false;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if !started {
            current.push_str(line);
            current_len = line_len;
            started = true;
            continue;
        }

        let overflows = current_len + 1 + line_len > max_size;
        if overflows && line_len > 0 && current_len > 0 {
            chunks.push(std::mem::take(&mut current));
            current.push_str(line);
            current_len = line_len;
        } else {
            current.push('\n');
            current.push_str(line);
            current_len += 1 + line_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
