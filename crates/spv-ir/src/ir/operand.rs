/// Semantic kind of an in-operand.
///
/// Type and result ids are not operands in this model; they live in their
/// own `Instruction` fields. Ids that arrive in variable-length lists are
/// tagged `IdRef` individually so each gets its own operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    LiteralWord,
    IdRef,
    LiteralString,
}

/// A tagged operand: a kind plus the raw words that carry it.
///
/// Literal strings are null-padded UTF-8 packed little-endian into 32-bit
/// words; every other kind is raw words.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    kind: OperandKind,
    words: Vec<u32>,
}

impl Operand {
    #[must_use]
    pub fn new(kind: OperandKind, words: Vec<u32>) -> Self {
        Self { kind, words }
    }

    /// A single id reference.
    #[must_use]
    pub fn id(id: u32) -> Self {
        Self::new(OperandKind::IdRef, vec![id])
    }

    /// A single literal word.
    #[must_use]
    pub fn literal(word: u32) -> Self {
        Self::new(OperandKind::LiteralWord, vec![word])
    }

    /// A literal string, packed into null-padded words.
    #[must_use]
    pub fn string(s: &str) -> Self {
        let bytes = s.as_bytes();
        let mut words = Vec::with_capacity(bytes.len() / 4 + 1);
        let mut word = 0u32;
        for (i, &b) in bytes.iter().enumerate() {
            word |= u32::from(b) << ((i % 4) * 8);
            if i % 4 == 3 {
                words.push(word);
                word = 0;
            }
        }
        // The terminating NUL always fits: either the tail word has a free
        // byte, or a fresh all-zero word is appended.
        words.push(word);
        Self::new(OperandKind::LiteralString, words)
    }

    #[must_use]
    pub fn kind(&self) -> OperandKind {
        self.kind
    }

    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    #[must_use]
    pub fn is_id(&self) -> bool {
        self.kind == OperandKind::IdRef
    }

    /// The operand's single word. Panics if the operand is not exactly one
    /// word wide.
    #[must_use]
    pub fn single_word(&self) -> u32 {
        assert_eq!(
            self.words.len(),
            1,
            "operand of kind {:?} is {} words wide",
            self.kind,
            self.words.len()
        );
        self.words[0]
    }

    pub(crate) fn set_single_word(&mut self, word: u32) {
        assert_eq!(self.words.len(), 1);
        self.words[0] = word;
    }

    /// Decode a literal-string operand. `None` for other kinds or if the
    /// packed bytes are not valid NUL-terminated UTF-8.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        if self.kind != OperandKind::LiteralString {
            return None;
        }
        let bytes: Vec<u8> = self
            .words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .take_while(|&b| b != 0)
            .collect();
        // A well-formed operand always has a NUL; reject when every byte of
        // every word is payload.
        if bytes.len() == self.words.len() * 4 {
            return None;
        }
        String::from_utf8(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_packing() {
        let op = Operand::string("abc");
        assert_eq!(op.words(), &[u32::from_le_bytes([b'a', b'b', b'c', 0])]);

        // A 4-byte string needs a second, all-zero word for the terminator.
        let op = Operand::string("main");
        assert_eq!(
            op.words(),
            &[u32::from_le_bytes([b'm', b'a', b'i', b'n']), 0]
        );
    }

    #[test]
    fn test_string_round_trip() {
        for s in ["", "a", "ab", "abc", "abcd", "abcde", "entry_point"] {
            assert_eq!(Operand::string(s).as_string().as_deref(), Some(s));
        }
    }

    #[test]
    #[should_panic(expected = "words wide")]
    fn test_single_word_on_string() {
        let _ = Operand::string("abcd").single_word();
    }
}
