//! Shared string table resolution.
//!
//! Both container formats deduplicate repeated cell text into a string
//! table referenced by index. Resolution is infallible: a missing table or
//! an out-of-range index yields the empty string. The XLS record stream can
//! legally reference the table before its record has been seen (a format
//! fragility, not an error), so lookups must tolerate an empty table.

/// An ordered, append-only shared string table.
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a fully-built table.
    pub fn from_vec(strings: Vec<String>) -> Self {
        SharedStrings { strings }
    }

    /// Replace the table contents (XLS: the SST record arrives mid-stream).
    pub fn load(&mut self, strings: Vec<String>) {
        if !self.strings.is_empty() {
            log::warn!("shared string table loaded twice; replacing");
        }
        self.strings = strings;
    }

    /// Append one string (XLSX: the table is streamed entry by entry).
    pub fn push(&mut self, s: String) {
        self.strings.push(s);
    }

    /// Resolve an index to its string. Never fails: an unpopulated table or
    /// invalid index resolves to `""`.
    pub fn get(&self, index: usize) -> &str {
        match self.strings.get(index) {
            Some(s) => s,
            None => {
                if !self.strings.is_empty() {
                    log::warn!(
                        "shared string index {index} out of range (table has {})",
                        self.strings.len()
                    );
                }
                ""
            }
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get() {
        let sst = SharedStrings::from_vec(vec!["a".into(), "b".into()]);
        assert_eq!(sst.get(0), "a");
        assert_eq!(sst.get(1), "b");
    }

    #[test]
    fn test_get_out_of_range_is_empty() {
        let sst = SharedStrings::from_vec(vec!["a".into()]);
        assert_eq!(sst.get(5), "");
    }

    #[test]
    fn test_get_before_load_is_empty() {
        let sst = SharedStrings::new();
        assert_eq!(sst.get(0), "");
    }

    #[test]
    fn test_load_replaces() {
        let mut sst = SharedStrings::new();
        sst.load(vec!["x".into()]);
        assert_eq!(sst.get(0), "x");
        assert_eq!(sst.len(), 1);
    }
}
