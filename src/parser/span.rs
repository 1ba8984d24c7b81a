// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Byte-offset spans for tokens

/// A token or other value tagged with the byte range it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// The wrapped value
    pub value: T,
    /// Offset of the first byte
    pub start: usize,
    /// Offset one past the last byte
    pub end: usize,
}

impl<T> Spanned<T> {
    /// Wrap `value` with the range `start..end`
    pub fn new(value: T, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }

    /// The source text this span was read from; empty for the end-of-input
    /// marker or a range outside `source`
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    #[test]
    fn test_slice_returns_source_text() {
        let source = "a.b ?? 'x\\'y'";
        let texts: Vec<&str> = tokenize(source)
            .unwrap()
            .iter()
            .map(|token| token.slice(source))
            .collect();
        assert_eq!(texts, vec!["a", ".", "b", "??", "'x\\'y'", ""]);
    }

    #[test]
    fn test_slice_out_of_range_is_empty() {
        assert_eq!(Spanned::new((), 3, 9).slice("abc"), "");
    }
}
