//! Code buffer with marker-based insertion.
//!
//! A buffer is owned by one generation pass. Markers are plain substrings;
//! every marker produced by [`Tag::evaluate`] is delimited by
//! [`CodegenOptions::tag_open`] and [`CodegenOptions::tag_close`], which is
//! how [`CodeBuffer::finish`] finds the ones nobody used.

use crate::error::CodegenError;
use crate::options::CodegenOptions;
use crate::tag::{Tag, TagDiscipline};
use conceptc_core::ConceptNode;
use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    text: String,
    options: CodegenOptions,
    used: HashSet<String>,
}

impl CodeBuffer {
    pub fn new(options: CodegenOptions) -> Self {
        CodeBuffer {
            text: String::new(),
            options,
            used: HashSet::new(),
        }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// Current content, markers included.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn tag_exists(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }

    /// The marker of `tag` for `concept`, for emitting extension points.
    pub fn marker(&self, tag: &Tag, concept: &ConceptNode) -> Result<String, CodegenError> {
        tag.evaluate(concept, &self.options)
    }

    /// Replace the marker with `text`. The marker is gone afterwards.
    pub fn replace(&mut self, marker: &str, text: &str) -> Result<(), CodegenError> {
        self.locate(marker)?;
        self.text = self.text.replace(marker, text);
        self.used.insert(marker.to_owned());
        Ok(())
    }

    /// Insert `text` in front of the marker, keeping the marker after it.
    pub fn insert_before(&mut self, marker: &str, text: &str) -> Result<(), CodegenError> {
        let at = self.locate(marker)?;
        self.text.insert_str(at, text);
        self.used.insert(marker.to_owned());
        Ok(())
    }

    /// Insert `text` right behind the marker, ahead of earlier insertions.
    pub fn insert_after(&mut self, marker: &str, text: &str) -> Result<(), CodegenError> {
        let at = self.locate(marker)? + marker.len();
        self.text.insert_str(at, text);
        self.used.insert(marker.to_owned());
        Ok(())
    }

    /// Insert at the marker of `tag` for `concept`, following the tag's
    /// discipline and wrapping.
    pub fn insert(&mut self, text: &str, tag: &Tag, concept: &ConceptNode) -> Result<(), CodegenError> {
        let marker = tag.evaluate(concept, &self.options)?;
        if tag.discipline() == TagDiscipline::Single && self.used.contains(&marker) {
            return Err(CodegenError::TagAlreadyUsed { marker });
        }
        let wrapped = tag.wrap_text(text, !self.used.contains(&marker));
        match tag.discipline() {
            TagDiscipline::Single => self.replace(&marker, &wrapped),
            TagDiscipline::Appendable => self.insert_before(&marker, &wrapped),
            TagDiscipline::Reverse => self.insert_after(&marker, &wrapped),
        }
    }

    /// Final text with every remaining marker removed, unless the options
    /// ask to keep them.
    pub fn finish(self) -> Result<String, CodegenError> {
        if self.options.keep_unused_tags {
            return Ok(self.text);
        }
        let pattern = format!(
            "(?s){}.*?{}",
            regex::escape(&self.options.tag_open),
            regex::escape(&self.options.tag_close)
        );
        let markers = Regex::new(&pattern).map_err(|e| CodegenError::Options(e.to_string()))?;
        Ok(markers.replace_all(&self.text, "").into_owned())
    }

    fn locate(&self, marker: &str) -> Result<usize, CodegenError> {
        match self.text.find(marker) {
            Some(at) => Ok(at),
            None if self.used.contains(marker) => Err(CodegenError::TagAlreadyUsed {
                marker: marker.to_owned(),
            }),
            None => Err(CodegenError::TagNotFound {
                marker: marker.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appendable_keeps_order() {
        let mut b = CodeBuffer::new(CodegenOptions::default());
        b.append("[/*<x>*/]");
        b.insert_before("/*<x>*/", "A").unwrap();
        b.insert_before("/*<x>*/", "B").unwrap();
        assert_eq!(b.as_str(), "[AB/*<x>*/]");
        assert_eq!(b.finish().unwrap(), "[AB]");
    }

    #[test]
    fn reverse_puts_latest_first() {
        let mut b = CodeBuffer::new(CodegenOptions::default());
        b.append("[/*<x>*/]");
        b.insert_after("/*<x>*/", "A").unwrap();
        b.insert_after("/*<x>*/", "B").unwrap();
        assert_eq!(b.finish().unwrap(), "[BA]");
    }

    #[test]
    fn replaced_marker_cannot_be_reused() {
        let mut b = CodeBuffer::new(CodegenOptions::default());
        b.append("/*<x>*/");
        b.replace("/*<x>*/", "A").unwrap();
        let err = b.replace("/*<x>*/", "B").unwrap_err();
        assert!(matches!(err, CodegenError::TagAlreadyUsed { .. }));
        assert_eq!(b.as_str(), "A");
    }

    #[test]
    fn unknown_marker_is_not_found() {
        let mut b = CodeBuffer::new(CodegenOptions::default());
        b.append("text");
        let err = b.insert_before("/*<y>*/", "A").unwrap_err();
        assert_eq!(err.code(), "GEN0001");
    }

    #[test]
    fn custom_delimiters_are_stripped() {
        let opts = CodegenOptions {
            tag_open: "<%".to_owned(),
            tag_close: "%>".to_owned(),
            keep_unused_tags: false,
        };
        let mut b = CodeBuffer::new(opts);
        b.append("a<% one %>b<% two %>c");
        assert_eq!(b.finish().unwrap(), "abc");
    }

    #[test]
    fn unused_markers_kept_on_request() {
        let opts = CodegenOptions {
            keep_unused_tags: true,
            ..CodegenOptions::default()
        };
        let mut b = CodeBuffer::new(opts);
        b.append("a/*<x>*/");
        assert_eq!(b.finish().unwrap(), "a/*<x>*/");
    }
}
