//! Attempt tokens: tickets that let a completing unlock attempt check whether
//! the handler that started it still cares about the result.

/// Ticket issued to an unlock attempt when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttemptToken {
    generation: u64,
}

/// Issues [`AttemptToken`]s and invalidates all outstanding ones at once.
#[derive(Debug, Default)]
pub(crate) struct AttemptTokens {
    generation: u64,
}

impl AttemptTokens {
    /// Issues a token valid until the next [`Self::invalidate_all`].
    pub(crate) const fn issue(&self) -> AttemptToken {
        AttemptToken {
            generation: self.generation,
        }
    }

    /// Invalidates every token issued so far.
    pub(crate) const fn invalidate_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Whether `token` was issued after the last invalidation.
    pub(crate) const fn is_valid(&self, token: AttemptToken) -> bool {
        token.generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_valid_until_invalidated() {
        let mut tokens = AttemptTokens::default();
        let first = tokens.issue();
        let second = tokens.issue();
        assert!(tokens.is_valid(first));
        assert!(tokens.is_valid(second));

        tokens.invalidate_all();
        assert!(!tokens.is_valid(first));
        assert!(!tokens.is_valid(second));
        assert!(tokens.is_valid(tokens.issue()));
    }
}
