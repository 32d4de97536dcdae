//! Accessor queries over JSON documents
//!
//! An accessor is a small XPath-style path evaluated against a
//! `serde_json::Value` tree. Object members are child nodes named by their
//! key; array elements are unnamed child nodes that only `*` matches.
//!
//! | Syntax | Meaning |
//! |---|---|
//! | `/a/b`, `a/b` | child steps from the document root |
//! | `//a` | `a` at any depth below the context |
//! | `*` | any child |
//! | `[2]` | second match under the same parent (1-based) |
//! | `[last()]` | last match under the same parent |
//! | `[id='7']` | matches having a child `id` whose text is `7` |
//!
//! The text of a node is its scalar value (`null` is empty); objects and
//! arrays concatenate the text of their children in document order.

use serde_json::Value;

use crate::error::FetchError;

/// Parsed accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Name(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    ChildEquals { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

impl Query {
    /// Parse an accessor string
    pub fn parse(accessor: &str) -> Result<Self, FetchError> {
        let input = accessor.trim();
        if input.is_empty() {
            return Err(FetchError::query("Accessor is empty"));
        }

        let (mut axis, mut rest) = if let Some(r) = input.strip_prefix("//") {
            (Axis::Descendant, r)
        } else if let Some(r) = input.strip_prefix('/') {
            (Axis::Child, r)
        } else {
            (Axis::Child, input)
        };

        let mut steps = Vec::new();
        loop {
            let (segment, remainder) = split_segment(rest, accessor)?;
            if segment.is_empty() {
                return Err(FetchError::query(format!(
                    "Empty step in accessor '{}'",
                    accessor
                )));
            }

            if segment == "." {
                if axis == Axis::Descendant {
                    return Err(FetchError::query(format!(
                        "Unsupported '//.' in accessor '{}'",
                        accessor
                    )));
                }
            } else {
                steps.push(Step::parse(segment, axis, accessor)?);
            }

            match remainder {
                None => break,
                Some(r) => match r.strip_prefix('/') {
                    Some(r) => {
                        axis = Axis::Descendant;
                        rest = r;
                    }
                    None => {
                        axis = Axis::Child;
                        rest = r;
                    }
                },
            }
        }

        Ok(Self { steps })
    }

    /// All matching nodes in document order
    pub fn select<'a>(&self, doc: &'a Value) -> Vec<&'a Value> {
        let mut context = vec![doc];

        for step in &self.steps {
            let mut next = Vec::new();
            for node in &context {
                match step.axis {
                    Axis::Child => next.extend(step.matching_children(node)),
                    Axis::Descendant => step.collect_descendants(node, &mut next),
                }
            }
            dedup_by_identity(&mut next);
            context = next;
            if context.is_empty() {
                break;
            }
        }

        context
    }

    /// First matching node in document order
    pub fn find_one<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.select(doc).into_iter().next()
    }
}

impl Step {
    fn parse(segment: &str, axis: Axis, accessor: &str) -> Result<Self, FetchError> {
        let (name, mut preds) = match segment.find('[') {
            Some(idx) => (&segment[..idx], &segment[idx..]),
            None => (segment, ""),
        };

        let name = name.trim();
        let test = match name {
            "" => {
                return Err(FetchError::query(format!(
                    "Missing node name in accessor '{}'",
                    accessor
                )));
            }
            "*" => NameTest::Any,
            other => NameTest::Name(other.to_string()),
        };

        let mut predicates = Vec::new();
        while !preds.is_empty() {
            let body_end = closing_bracket(preds).ok_or_else(|| {
                FetchError::query(format!("Unclosed '[' in accessor '{}'", accessor))
            })?;
            predicates.push(Predicate::parse(&preds[1..body_end], accessor)?);
            preds = preds[body_end + 1..].trim_start();
            if !preds.is_empty() && !preds.starts_with('[') {
                return Err(FetchError::query(format!(
                    "Unexpected '{}' in accessor '{}'",
                    preds, accessor
                )));
            }
        }

        Ok(Self {
            axis,
            test,
            predicates,
        })
    }

    /// Children of `node` passing the name test and every predicate
    fn matching_children<'a>(&self, node: &'a Value) -> Vec<&'a Value> {
        let mut matched: Vec<&Value> = children(node)
            .into_iter()
            .filter(|(name, _)| match (&self.test, name) {
                (NameTest::Any, _) => true,
                (NameTest::Name(wanted), Some(name)) => wanted == name,
                (NameTest::Name(_), None) => false,
            })
            .map(|(_, child)| child)
            .collect();

        for predicate in &self.predicates {
            matched = predicate.apply(matched);
        }
        matched
    }

    /// Matches anywhere below `node`, in document order
    fn collect_descendants<'a>(&self, node: &'a Value, out: &mut Vec<&'a Value>) {
        let matched = self.matching_children(node);
        for (_, child) in children(node) {
            if matched.iter().any(|m| std::ptr::eq(*m, child)) {
                out.push(child);
            }
            self.collect_descendants(child, out);
        }
    }
}

impl Predicate {
    fn parse(body: &str, accessor: &str) -> Result<Self, FetchError> {
        let body = body.trim();

        if body == "last()" {
            return Ok(Predicate::Last);
        }

        if !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()) {
            let position: usize = body.parse().map_err(|_| {
                FetchError::query(format!("Bad position [{}] in accessor '{}'", body, accessor))
            })?;
            if position == 0 {
                return Err(FetchError::query(format!(
                    "Positions start at 1 in accessor '{}'",
                    accessor
                )));
            }
            return Ok(Predicate::Position(position));
        }

        if let Some((key, value)) = body.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')));
            if let Some(unquoted) = unquoted
                && !key.is_empty()
            {
                return Ok(Predicate::ChildEquals {
                    key: key.to_string(),
                    value: unquoted.to_string(),
                });
            }
        }

        Err(FetchError::query(format!(
            "Unsupported predicate [{}] in accessor '{}'",
            body, accessor
        )))
    }

    fn apply<'a>(&self, nodes: Vec<&'a Value>) -> Vec<&'a Value> {
        match self {
            Predicate::Position(n) => nodes.into_iter().nth(n - 1).into_iter().collect(),
            Predicate::Last => nodes.last().copied().into_iter().collect(),
            Predicate::ChildEquals { key, value } => nodes
                .into_iter()
                .filter(|node| {
                    node.get(key.as_str())
                        .is_some_and(|child| inner_text(child) == *value)
                })
                .collect(),
        }
    }
}

/// Text content of a node
pub fn inner_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => children(value)
            .into_iter()
            .map(|(_, child)| inner_text(child))
            .collect(),
    }
}

/// Child nodes with their names (array elements are unnamed)
fn children(value: &Value) -> Vec<(Option<&str>, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
        _ => Vec::new(),
    }
}

fn dedup_by_identity(nodes: &mut Vec<&Value>) {
    let mut seen: Vec<*const Value> = Vec::with_capacity(nodes.len());
    nodes.retain(|node| {
        let ptr = *node as *const Value;
        if seen.contains(&ptr) {
            false
        } else {
            seen.push(ptr);
            true
        }
    });
}

/// Split off the next step at a top-level `/`
fn split_segment<'a>(
    input: &'a str,
    accessor: &str,
) -> Result<(&'a str, Option<&'a str>), FetchError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (idx, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    FetchError::query(format!("Unbalanced ']' in accessor '{}'", accessor))
                })?;
            }
            (None, '/') if depth == 0 => return Ok((&input[..idx], Some(&input[idx + 1..]))),
            _ => {}
        }
    }

    if depth != 0 || quote.is_some() {
        return Err(FetchError::query(format!(
            "Unclosed bracket or quote in accessor '{}'",
            accessor
        )));
    }
    Ok((input, None))
}

/// Index of the `]` closing the `[` at the start of `input`
fn closing_bracket(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in input.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(idx),
            _ => {}
        }
    }
    None
}
