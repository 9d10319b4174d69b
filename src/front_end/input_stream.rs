use std::sync::Arc;

// Character input stream used by the scanner. It reads runes straight from the utf-8 source,
// tracks the current line and keeps a table with the start offsets of every line seen so far.
pub struct InputStream {
    buffer: Arc<str>,               // Source text, shared with the consumer side of the lexer
    pub current_offset: usize,      // Current byte offset of the reader
    pub current_line: usize,        // Current line (1 based)
    width: usize,                   // Width of the last read char, 0 when there is nothing to unread
    scanned: usize,                 // Offset up to which newlines are recorded in line_offset
    line_offset: Vec<usize>,        // Start offsets of all lines scanned so far (index 0 is line 1)
}

impl InputStream {
    // Create a new default empty input stream
    pub fn new() -> Self {
        InputStream {
            buffer: Arc::from(""),
            current_offset: 0,
            current_line: 1,
            width: 0,
            scanned: 0,
            line_offset: vec![0],       // Line 1 starts at offset 0
        }
    }

    // Populates the stream with the given string and resets the reader
    #[cfg(test)]
    pub(crate) fn read_from_str(&mut self, s: &str) {
        self.read_from_shared(Arc::from(s));
    }

    // Populates the stream with an already shared source and resets the reader
    pub fn read_from_shared(&mut self, source: Arc<str>) {
        self.buffer = source;
        self.line_offset = vec![0];
        self.scanned = 0;
        self.reset();
    }

    pub fn source(&self) -> &str {
        &self.buffer
    }

    pub fn length(&self) -> usize {
        self.buffer.len()
    }

    // Returns true when the stream pointer is at the end of the stream
    #[cfg(test)]
    pub(crate) fn eof(&self) -> bool {
        self.current_offset >= self.buffer.len()
    }

    // Reset the stream reader back to the start
    pub fn reset(&mut self) {
        self.current_offset = 0;
        self.current_line = 1;
        self.width = 0;
    }

    pub fn tell(&self) -> usize {
        self.current_offset
    }

    // Returns the number of characters left in the buffer
    #[cfg(test)]
    pub(crate) fn chars_left(&self) -> usize {
        self.buffer[self.current_offset..].chars().count()
    }

    // Offset of the first character of the current line
    pub fn current_line_start(&self) -> usize {
        self.line_offset[self.current_line - 1]
    }

    // Column of the reader on the current line (1 based, counted in chars)
    pub fn current_column(&self) -> usize {
        self.buffer[self.current_line_start()..self.current_offset].chars().count() + 1
    }

    // Start offset of the given (1 based) line, if the stream has scanned that far
    #[cfg(test)]
    pub(crate) fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        self.line_offset.get(line - 1).copied()
    }

    // Seek to an explicit byte offset in the stream. The offset is capped to the stream length
    // and moved back onto a char boundary. Nothing can be unread after a seek.
    pub fn seek(&mut self, mut off: usize) {
        if off > self.buffer.len() {
            off = self.buffer.len();
        }
        while !self.buffer.is_char_boundary(off) {
            off -= 1;
        }

        // Not scanned this far yet, record the lines between the last scanned point and the offset
        if off > self.scanned {
            self.record_lines(self.scanned, off);
        }

        self.current_offset = off;
        self.current_line = self.line_offset.partition_point(|&o| o <= off);
        self.width = 0;
    }

    // Reads a character and increases the current pointer
    pub fn read_char(&mut self) -> Option<char> {
        let c = match self.buffer[self.current_offset..].chars().next() {
            Some(c) => c,
            None => {
                self.width = 0;
                return None;
            }
        };

        self.width = c.len_utf8();
        self.current_offset += self.width;

        if c == '\n' {
            self.current_line += 1;
            if self.current_offset > self.scanned {
                self.line_offset.push(self.current_offset);
            }
        }
        if self.current_offset > self.scanned {
            self.scanned = self.current_offset;
        }

        Some(c)
    }

    // Moves back over the last read character. Only one level of undo is kept, so a second
    // unread (or an unread after eof or a seek) does nothing.
    pub fn unread(&mut self) {
        if self.width == 0 {
            return;
        }

        self.current_offset -= self.width;
        self.width = 0;

        if self.buffer.as_bytes()[self.current_offset] == b'\n' {
            self.current_line -= 1;
        }
    }

    // Looks ahead in the stream without consuming anything. An index of 0 returns the char
    // that the next read_char() would return.
    pub fn look_ahead(&self, idx: usize) -> Option<char> {
        self.buffer[self.current_offset..].chars().nth(idx)
    }

    fn record_lines(&mut self, from: usize, to: usize) {
        for (i, b) in self.buffer.as_bytes()[from..to].iter().enumerate() {
            if *b == b'\n' {
                self.line_offset.push(from + i + 1);
            }
        }
        self.scanned = to;
    }
}

impl Default for InputStream {
    fn default() -> Self {
        Self::new()
    }
}
