use serde_json::Value;
use std::{collections::HashMap, fmt};

/// A GraphQL response body.
///
/// Exchanges pass around `Response<serde_json::Value>`, the client hands out
/// `Response<Q::ResponseData>`.
///
/// ```
/// use hydra::{PathFragment, Response};
/// use serde_json::{json, Value};
///
/// let response: Response<Value> = serde_json::from_value(json!({
///     "data": { "film": null },
///     "errors": [{ "message": "not found", "path": ["film"] }]
/// }))
/// .unwrap();
///
/// assert!(response.has_errors());
/// let errors = response.errors.unwrap();
/// assert_eq!(errors[0].path, Some(vec![PathFragment::Key("film".to_string())]));
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Response<Data: Clone> {
    pub data: Option<Data>,
    pub errors: Option<Vec<Error>>
}

impl<Data: Clone> Response<Data> {
    pub fn has_errors(&self) -> bool {
        matches!(self.errors, Some(ref errors) if !errors.is_empty())
    }
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Error {
    pub message: String,
    pub locations: Option<Vec<Location>>,
    /// Where in the response data the error happened, e.g. `["films", 2, "title"]`.
    pub path: Option<Vec<PathFragment>>,
    /// Server specific details.
    pub extensions: Option<HashMap<String, Value>>
}

/// A field name or list index in an error path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PathFragment {
    Key(String),
    Index(i32)
}

/// Line and column in the query text, both starting at 1.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub line: i32,
    pub column: i32
}

impl fmt::Display for PathFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFragment::Key(key) => f.write_str(key),
            PathFragment::Index(index) => write!(f, "{}", index)
        }
    }
}

/// Formats as `path:line:column: message`. Path fragments are joined with `/`, a missing path
/// shows as `<query>` and only the first location is used.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path {
            Some(ref path) => {
                let fragments: Vec<String> = path.iter().map(ToString::to_string).collect();
                f.write_str(&fragments.join("/"))?;
            }
            None => f.write_str("<query>")?
        }

        let location = self
            .locations
            .as_ref()
            .and_then(|locations| locations.first().copied())
            .unwrap_or_default();
        write!(f, ":{}:{}: {}", location.line, location.column, self.message)
    }
}
