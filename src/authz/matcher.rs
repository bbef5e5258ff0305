//! Permission-name reconciliation.
//!
//! A permission name may carry the wildcard character `*`, which stands for
//! any run of zero or more characters. The run is not bounded by the `.`
//! delimiter, so `prestasi.*` covers `prestasi.siswa.provinsi.create` as well
//! as `prestasi.create`. Every other character, the delimiter included, must
//! match literally. The one exception is a trailing `.*` segment: the
//! delimiter in front of it may go unmatched, so `users.*` also covers the bare
//! family name `users`.

/// The single wildcard token recognised in permission names.
pub const WILDCARD: char = '*';

/// Path delimiter between permission-name segments.
pub const DELIMITER: char = '.';

/// Returns true when `a` and `b` name the same or an overlapping capability.
///
/// Exact equality wins first. Otherwise whichever side holds the wildcard is
/// compiled into a pattern and applied to the other side, checking `a` before
/// `b`. Two concrete names that differ never match.
pub fn matches(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    if a.contains(WILDCARD) {
        return WildcardPattern::new(a).is_match(b);
    }

    if b.contains(WILDCARD) {
        return WildcardPattern::new(b).is_match(a);
    }

    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// Consumes exactly this character.
    Literal(char),
    /// Consumes any character any number of times.
    Any,
    /// Optional group start: either continue or jump past the group.
    Skip(usize),
}

/// A compiled permission pattern.
///
/// Every character other than the wildcard is a literal, so names containing
/// characters that are special to regular expressions need no escaping. The
/// pattern runs as a small NFA over its token list; evaluation tracks the set
/// of live states per input character and is bounded by
/// `pattern length * input length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    tokens: Vec<Token>,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len() + 1);
        let mut i = 0;

        while i < chars.len() {
            let trailing_family = chars[i] == DELIMITER
                && chars.get(i + 1) == Some(&WILDCARD)
                && chars.get(i + 2).is_none();

            if trailing_family {
                // a final `.*` is `(\..*)?`
                let after = tokens.len() + 3;
                tokens.push(Token::Skip(after));
                tokens.push(Token::Literal(DELIMITER));
                tokens.push(Token::Any);
                i += 2;
                continue;
            }

            tokens.push(match chars[i] {
                WILDCARD => Token::Any,
                c => Token::Literal(c),
            });
            i += 1;
        }

        Self { tokens }
    }

    pub fn is_match(&self, input: &str) -> bool {
        let accept = self.tokens.len();
        let mut current = vec![false; accept + 1];
        self.enter(&mut current, 0);

        for ch in input.chars() {
            let mut next = vec![false; accept + 1];
            for (state, token) in self.tokens.iter().enumerate() {
                if !current[state] {
                    continue;
                }
                match *token {
                    Token::Literal(c) if c == ch => self.enter(&mut next, state + 1),
                    Token::Any => self.enter(&mut next, state),
                    _ => {}
                }
            }

            if !next.iter().any(|live| *live) {
                return false;
            }
            current = next;
        }

        current[accept]
    }

    /// Marks `state` live along with everything reachable without input.
    fn enter(&self, states: &mut [bool], state: usize) {
        if states[state] {
            return;
        }
        states[state] = true;

        match self.tokens.get(state) {
            Some(Token::Any) => self.enter(states, state + 1),
            Some(Token::Skip(after)) => {
                self.enter(states, state + 1);
                self.enter(states, *after);
            }
            _ => {}
        }
    }
}
