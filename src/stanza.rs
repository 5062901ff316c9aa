use crate::{
    error::{InspectError, InspectResult},
    package::PackageRecord,
};
use std::io::BufRead;

// lines starting with whitespace continue the previous field
fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    line.strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub struct StanzaScanner<R: BufRead> {
    reader: R,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> StanzaScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            done: false,
        }
    }

    fn read_line(&mut self, buf: &mut String) -> InspectResult<bool> {
        buf.clear();
        let n = self.reader.read_line(buf)?;
        if n > 0 {
            self.line_no += 1;
        }
        Ok(n > 0)
    }

    fn next_record(&mut self) -> InspectResult<Option<PackageRecord>> {
        let mut line = String::new();

        // skip separators until the first line of a stanza
        loop {
            if !self.read_line(&mut line)? {
                return Ok(None);
            }
            if !is_blank(&line) {
                break;
            }
        }

        let start = self.line_no;
        let mut name = None;
        let mut version = None;
        loop {
            if let Some(value) = field_value(&line, "Package") {
                name = Some(value.to_string());
            } else if let Some(value) = field_value(&line, "Version") {
                version = Some(value.to_string());
            }
            if !self.read_line(&mut line)? || is_blank(&line) {
                break;
            }
        }

        match (name, version) {
            (Some(name), Some(version)) => Ok(Some(PackageRecord::new(name, version))),
            (Some(name), None) => Err(InspectError::MalformedIndex(format!(
                "package '{}' (stanza at line {}) has no Version field",
                name, start
            ))),
            (None, _) => Err(InspectError::MalformedIndex(format!(
                "stanza at line {} has no Package field",
                start
            ))),
        }
    }
}

impl<R: BufRead> Iterator for StanzaScanner<R> {
    type Item = InspectResult<PackageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Returns the first stanza whose `Package` field equals `name`, verbatim and
/// without the blank line that ends it. Reading stops after that stanza.
pub fn find_stanza<R: BufRead>(mut reader: R, name: &str) -> InspectResult<Option<String>> {
    let mut line = String::new();
    let mut stanza = String::new();
    let mut matched = false;
    loop {
        line.clear();
        let eof = reader.read_line(&mut line)? == 0;
        if eof || is_blank(&line) {
            if matched {
                return Ok(Some(stanza));
            }
            if eof {
                return Ok(None);
            }
            stanza.clear();
            continue;
        }
        if field_value(&line, "Package") == Some(name) {
            matched = true;
        }
        stanza.push_str(&line);
    }
}

pub fn release_components(release: &str) -> InspectResult<Vec<String>> {
    release
        .lines()
        .find_map(|line| field_value(line, "Components"))
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .ok_or_else(|| {
            InspectError::MalformedIndex("Release file has no Components field".to_string())
        })
}
