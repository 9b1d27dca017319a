use thiserror::Error;

use super::dom::{Document, NodeId, DOCUMENT};

/// Errors raised when compiling a selector string.
///
/// Selector strings come from per-source configuration; a string that
/// does not compile is a configuration problem and fails the feed it
/// belongs to, not the whole batch.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,

    #[error("invalid selector token: {0:?}")]
    InvalidToken(String),

    #[error("combinator without a tag on both sides: {0:?}")]
    DanglingCombinator(String),
}

#[derive(Debug, Clone, PartialEq)]
enum StepName {
    Any,
    Tag(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    /// Whitespace: any ancestor matches the previous step.
    Descendant,
    /// `>`: the parent matches the previous step.
    Child,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    name: StepName,
    /// Relation between this step and the one before it. The first
    /// step is always a descendant of the evaluation scope.
    combinator: Combinator,
}

/// A compiled tag-path selector over feed markup.
///
/// The dialect covers what per-source extraction rules actually use:
/// tag names (namespace prefixes included) or `*`, joined by the
/// descendant (whitespace) and child (`>`) combinators. Examples:
/// `item`, `channel > title`, `entry updated`.
///
/// Feed markup is XML, so evaluation runs over the [`Document`] tree
/// rather than an HTML5 parse — an HTML parser would treat `<link>` as
/// a void element and detach its text.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    steps: Vec<Step>,
}

impl Selector {
    /// Compile a selector string.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        // `a>b` and `a > b` are equivalent
        let spaced = input.replace('>', " > ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut steps = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut expect_name = true;

        for token in tokens {
            if token == ">" {
                if expect_name {
                    return Err(SelectorError::DanglingCombinator(input.to_string()));
                }
                pending = Combinator::Child;
                expect_name = true;
                continue;
            }

            let name = if token == "*" {
                StepName::Any
            } else if is_valid_tag(token) {
                StepName::Tag(token.to_string())
            } else {
                return Err(SelectorError::InvalidToken(token.to_string()));
            };

            steps.push(Step {
                name,
                combinator: pending,
            });
            pending = Combinator::Descendant;
            expect_name = false;
        }

        if expect_name {
            return Err(SelectorError::DanglingCombinator(input.to_string()));
        }

        Ok(Selector { steps })
    }

    /// All elements under `scope` (scope itself excluded) matching this
    /// selector, in document order.
    pub fn select_all(&self, doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.descendants(scope)
            .into_iter()
            .filter(|&node| self.matches(doc, scope, node))
            .collect()
    }

    /// First matching element under `scope`, in document order.
    pub fn select_first(&self, doc: &Document, scope: NodeId) -> Option<NodeId> {
        doc.descendants(scope)
            .into_iter()
            .find(|&node| self.matches(doc, scope, node))
    }

    /// Right-to-left step matching, the way CSS engines do it: the
    /// candidate must match the last step, and some chain of ancestors
    /// inside the scope must match the remaining steps.
    fn matches(&self, doc: &Document, scope: NodeId, node: NodeId) -> bool {
        self.matches_at(doc, scope, node, self.steps.len() - 1)
    }

    fn matches_at(&self, doc: &Document, scope: NodeId, node: NodeId, idx: usize) -> bool {
        let step = &self.steps[idx];
        let name_ok = match &step.name {
            StepName::Any => true,
            StepName::Tag(t) => doc.name(node) == t,
        };
        if !name_ok {
            return false;
        }
        if idx == 0 {
            // already known to be a descendant of scope
            return true;
        }
        match step.combinator {
            Combinator::Child => match doc.parent(node) {
                Some(parent) if parent != scope && parent != DOCUMENT => {
                    self.matches_at(doc, scope, parent, idx - 1)
                }
                _ => false,
            },
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(anc) = current {
                    if anc == scope || anc == DOCUMENT {
                        break;
                    }
                    if self.matches_at(doc, scope, anc, idx - 1) {
                        return true;
                    }
                    current = doc.parent(anc);
                }
                false
            }
        }
    }
}

fn is_valid_tag(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Deep text of the first element matching `selector` under `scope`,
/// trimmed. A match whose text is empty behaves like no match at all —
/// callers supply their own defaults either way.
pub fn evaluate(doc: &Document, scope: NodeId, selector: &Selector) -> Option<String> {
    selector
        .select_first(doc, scope)
        .map(|node| doc.deep_text(node).trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(markup: &str) -> Document {
        Document::parse(markup).unwrap()
    }

    #[test]
    fn test_single_tag_matches_any_depth() {
        let d = doc("<rss><channel><item><title>A</title></item><item><title>B</title></item></channel></rss>");
        let sel = Selector::parse("item").unwrap();
        assert_eq!(sel.select_all(&d, DOCUMENT).len(), 2);
    }

    #[test]
    fn test_document_order() {
        let d = doc("<r><x><t>1</t></x><t>2</t><x><t>3</t></x></r>");
        let sel = Selector::parse("t").unwrap();
        let texts: Vec<_> = sel
            .select_all(&d, DOCUMENT)
            .into_iter()
            .map(|n| d.deep_text(n))
            .collect();
        assert_eq!(texts, ["1", "2", "3"]);
    }

    #[test]
    fn test_descendant_combinator() {
        let d = doc("<rss><channel><title>Feed</title><item><title>Item</title></item></channel></rss>");
        let sel = Selector::parse("channel title").unwrap();
        // both titles are descendants of channel
        assert_eq!(sel.select_all(&d, DOCUMENT).len(), 2);
    }

    #[test]
    fn test_child_combinator() {
        let d = doc("<rss><channel><title>Feed</title><item><title>Item</title></item></channel></rss>");
        let sel = Selector::parse("channel > title").unwrap();
        let matches = sel.select_all(&d, DOCUMENT);
        assert_eq!(matches.len(), 1);
        assert_eq!(d.deep_text(matches[0]), "Feed");
    }

    #[test]
    fn test_child_combinator_without_spaces() {
        let d = doc("<rss><channel><title>Feed</title></channel></rss>");
        let sel = Selector::parse("channel>title").unwrap();
        assert_eq!(sel.select_all(&d, DOCUMENT).len(), 1);
    }

    #[test]
    fn test_scoped_evaluation() {
        let d = doc("<rss><channel><title>Feed</title><item><title>Item</title></item></channel></rss>");
        let item = Selector::parse("item").unwrap().select_first(&d, DOCUMENT).unwrap();
        let title = Selector::parse("title").unwrap();
        assert_eq!(evaluate(&d, item, &title), Some("Item".to_string()));
    }

    #[test]
    fn test_wildcard() {
        let d = doc("<r><a>1</a><b>2</b></r>");
        let sel = Selector::parse("r > *").unwrap();
        assert_eq!(sel.select_all(&d, DOCUMENT).len(), 2);
    }

    #[test]
    fn test_namespaced_tag() {
        let d = doc("<r><dc:creator>x</dc:creator></r>");
        let sel = Selector::parse("dc:creator").unwrap();
        assert_eq!(sel.select_all(&d, DOCUMENT).len(), 1);
    }

    #[test]
    fn test_no_match_is_none() {
        let d = doc("<r><a>1</a></r>");
        let sel = Selector::parse("missing").unwrap();
        assert_eq!(evaluate(&d, DOCUMENT, &sel), None);
    }

    #[test]
    fn test_empty_text_match_is_none() {
        let d = doc("<r><a>  </a></r>");
        let sel = Selector::parse("a").unwrap();
        assert_eq!(evaluate(&d, DOCUMENT, &sel), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Selector::parse(""), Err(SelectorError::Empty)));
        assert!(matches!(Selector::parse("   "), Err(SelectorError::Empty)));
        assert!(matches!(
            Selector::parse("> title"),
            Err(SelectorError::DanglingCombinator(_))
        ));
        assert!(matches!(
            Selector::parse("channel >"),
            Err(SelectorError::DanglingCombinator(_))
        ));
        assert!(matches!(
            Selector::parse("item[attr]"),
            Err(SelectorError::InvalidToken(_))
        ));
        assert!(matches!(
            Selector::parse(".class"),
            Err(SelectorError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_scope_itself_never_matches() {
        let d = doc("<item><item>nested</item></item>");
        let outer = Selector::parse("item").unwrap().select_first(&d, DOCUMENT).unwrap();
        let sel = Selector::parse("item").unwrap();
        let matches = sel.select_all(&d, outer);
        assert_eq!(matches.len(), 1);
        assert_eq!(d.deep_text(matches[0]), "nested");
    }
}
