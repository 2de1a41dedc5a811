//! Part extraction: zoom into a named part of both programs.

use crate::error::{AuthoringError, CheckResult};
use crate::ordinal::get_ord;
use crate::session::Session;
use crate::state::{Extracted, LineageEntry, State};
use crate::template::{render, Bindings};
use sct_types::parts::{Part, PartKey};
use serde_json::Value as Json;
use tracing::debug;

const MISSING_PART: &str = "Are you sure you defined the {{part}}?";
const EXPAND_PART: &str = "Did you correctly specify the {{part}}?";
const MISSING_ARG: &str = "Did you specify the {{part}}?";

/// Where to look inside a named part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartIndex {
    Key(PartKey),
    /// Descend through nested mappings one key at a time.
    Path(Vec<PartKey>),
}

impl PartIndex {
    pub(crate) fn keys(&self) -> &[PartKey] {
        match self {
            PartIndex::Key(key) => std::slice::from_ref(key),
            PartIndex::Path(keys) => keys,
        }
    }

    pub(crate) fn to_json(&self) -> Json {
        match self {
            PartIndex::Key(key) => key_json(key),
            PartIndex::Path(keys) => Json::Array(keys.iter().map(key_json).collect()),
        }
    }

    /// Ordinal of a single positional index, else empty.
    pub(crate) fn ordinal(&self) -> String {
        match self {
            PartIndex::Key(PartKey::Index(i)) => get_ord(i + 1),
            _ => String::new(),
        }
    }
}

impl From<usize> for PartIndex {
    fn from(index: usize) -> Self {
        PartIndex::Key(PartKey::Index(index))
    }
}

impl From<&str> for PartIndex {
    fn from(name: &str) -> Self {
        PartIndex::Key(PartKey::from(name))
    }
}

impl From<PartKey> for PartIndex {
    fn from(key: PartKey) -> Self {
        PartIndex::Key(key)
    }
}

impl From<Vec<PartKey>> for PartIndex {
    fn from(keys: Vec<PartKey>) -> Self {
        PartIndex::Path(keys)
    }
}

pub(crate) fn key_json(key: &PartKey) -> Json {
    match key {
        PartKey::Index(i) => Json::from(*i),
        PartKey::Name(name) => Json::String(name.clone()),
    }
}

/// Overrides for the two messages every extraction can produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    /// Shown when the student side lacks the part.
    pub missing: Option<String>,
    /// Prefixed to every diagnostic raised below the part.
    pub expand: Option<String>,
}

impl Messages {
    pub fn missing(mut self, template: impl Into<String>) -> Self {
        self.missing = Some(template.into());
        self
    }

    pub fn expand(mut self, template: impl Into<String>) -> Self {
        self.expand = Some(template.into());
        self
    }

    pub(crate) fn missing_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.missing.as_deref().unwrap_or(default)
    }

    pub(crate) fn expand_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.expand.as_deref().unwrap_or(default)
    }
}

/// A function argument, as addressed by [`State::check_args`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Position(usize),
    Name(String),
    /// The `*args` parameter.
    VarArgs,
    /// The `**kwargs` parameter.
    KwArgs,
    Path(Vec<PartKey>),
}

impl From<usize> for Arg {
    fn from(index: usize) -> Self {
        Arg::Position(index)
    }
}

impl From<&str> for Arg {
    fn from(name: &str) -> Self {
        match name {
            "*args" => Arg::VarArgs,
            "**kwargs" => Arg::KwArgs,
            _ => Arg::Name(name.to_string()),
        }
    }
}

impl Arg {
    /// How the argument is named in messages.
    fn describe(&self) -> String {
        match self {
            Arg::Position(i) => format!("{} argument", get_ord(i + 1)),
            Arg::Name(name) => format!("argument `{name}`"),
            Arg::VarArgs => "argument `*args`".to_string(),
            Arg::KwArgs => "argument `**kwargs`".to_string(),
            Arg::Path(keys) => match keys.as_slice() {
                [PartKey::Name(first), PartKey::Index(i), ..] if first == "args" => format!(
                    "{} argument passed as a variable length argument",
                    get_ord(i + 1)
                ),
                [_, second, ..] => format!("argument `{second}`"),
                [only] => format!("argument `{only}`"),
                [] => "argument".to_string(),
            },
        }
    }

    /// Where the argument lives in the parts mapping.
    ///
    /// Paths are resolved inside `args`, which holds positions and names
    /// side by side. A leading `args` or `kwargs` key only says which kind
    /// of argument follows, so it is dropped.
    fn location(&self) -> (String, Option<PartIndex>) {
        let index = match self {
            Arg::Position(i) => PartIndex::from(*i),
            Arg::Name(name) => PartIndex::from(name.as_str()),
            Arg::VarArgs => return ("*args".into(), None),
            Arg::KwArgs => return ("**kwargs".into(), None),
            Arg::Path(keys) => match keys.as_slice() {
                [PartKey::Name(kind), rest @ ..]
                    if !rest.is_empty() && (kind == "args" || kind == "kwargs") =>
                {
                    PartIndex::Path(rest.to_vec())
                }
                _ => PartIndex::Path(keys.clone()),
            },
        };
        ("args".into(), Some(index))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Extraction
// ══════════════════════════════════════════════════════════════════════════════

/// Why the student side has no part at the requested place.
#[derive(Debug)]
pub(crate) enum Miss {
    NoSuchName,
    NoSuchKey(PartKey),
    NotANode,
}

pub(crate) fn lookup<'a>(part: &'a Part, keys: &[PartKey]) -> Result<&'a Part, Miss> {
    keys.iter().try_fold(part, |part, key| {
        part.get(key).ok_or_else(|| Miss::NoSuchKey(key.clone()))
    })
}

impl State {
    /// Zoom into the part called `name` on both sides.
    ///
    /// `part_msg` describes the part in messages and defaults to `name`.
    pub fn check_part(
        &self,
        session: &mut Session,
        name: &str,
        part_msg: Option<&str>,
        messages: &Messages,
    ) -> CheckResult<State> {
        let mut bindings = Bindings::new();
        bindings.insert(
            "part".to_string(),
            Json::String(part_msg.unwrap_or(name).to_string()),
        );
        self.extract(session, name, None, bindings, messages, MISSING_PART)
    }

    /// Zoom into the element `index` of the part called `name`.
    ///
    /// `part_msg` may use `{{index}}` and `{{ordinal}}`.
    pub fn check_part_index(
        &self,
        session: &mut Session,
        name: &str,
        index: impl Into<PartIndex>,
        part_msg: &str,
        messages: &Messages,
    ) -> CheckResult<State> {
        let index = index.into();
        let mut bindings = Bindings::new();
        bindings.insert("index".to_string(), index.to_json());
        bindings.insert("ordinal".to_string(), Json::String(index.ordinal()));
        let part = render(part_msg, &bindings)?;
        bindings.insert("part".to_string(), Json::String(part));
        self.extract(session, name, Some(&index), bindings, messages, MISSING_PART)
    }

    /// Zoom into a parameter of a function definition or lambda.
    pub fn check_args(
        &self,
        session: &mut Session,
        arg: impl Into<Arg>,
        missing_msg: Option<&str>,
    ) -> CheckResult<State> {
        let arg = arg.into();
        let messages = Messages {
            missing: missing_msg.map(str::to_string),
            expand: None,
        };
        let mut bindings = Bindings::new();
        bindings.insert("part".to_string(), Json::String(arg.describe()));
        let (name, index) = arg.location();
        if let Some(index) = &index {
            bindings.insert("index".to_string(), index.to_json());
            bindings.insert("ordinal".to_string(), Json::String(index.ordinal()));
        }
        self.extract(session, &name, index.as_ref(), bindings, &messages, MISSING_ARG)
    }

    /// Zoom into the body of a function definition, lambda or `with`.
    pub fn check_body(&self, session: &mut Session) -> CheckResult<State> {
        self.check_part(session, "body", None, &Messages::default())
    }

    fn extract(
        &self,
        session: &mut Session,
        name: &str,
        index: Option<&PartIndex>,
        bindings: Bindings,
        messages: &Messages,
        default_missing: &str,
    ) -> CheckResult<State> {
        let keys = index.map(PartIndex::keys).unwrap_or_default();
        let described = || match index {
            Some(index) => format!("{name}{:?}", index.keys()),
            None => name.to_string(),
        };

        let solution = self
            .solution_parts
            .get(name)
            .and_then(|part| lookup(part, keys).ok())
            .ok_or_else(|| AuthoringError::MissingSolutionPart(described()))?;
        let solution = Extracted::from_part(solution)
            .ok_or_else(|| AuthoringError::MalformedSolutionPart(described()))?;

        let student = self
            .student_parts
            .get(name)
            .ok_or(Miss::NoSuchName)
            .and_then(|part| lookup(part, keys))
            .and_then(|part| Extracted::from_part(part).ok_or(Miss::NotANode));
        let student = match student {
            Ok(student) => student,
            Err(miss) => {
                debug!(part = %described(), ?miss, "student part missing");
                let message =
                    self.build_message(messages.missing_or(default_missing), &bindings)?;
                return Err(session.fail(self.feedback(message)));
            }
        };

        debug!(part = %described(), "extracted part");
        let entry = LineageEntry::new(messages.expand_or(EXPAND_PART), bindings);
        Ok(self.to_child(student, solution, entry))
    }
}
