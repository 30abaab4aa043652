use serde::Serialize;
use serde_json::Value;
use std::{collections::HashSet, num::Wrapping};

/// When we have separate values it's useful to run a progressive
/// version of djb2 where we pretend that we're still looping over
/// the same value
pub fn progressive_hash<V: Serialize>(h: u32, x: &V) -> Result<u64, serde_json::Error> {
    let x = serde_json::to_vec(x)?;

    let mut h = Wrapping(h as u64);

    for byte in x {
        h = (h << 5) + h + Wrapping(byte as u64)
    }

    Ok(h.0)
}

/// Collects every `__typename` found anywhere in the data.
pub fn collect_typenames(data: &Value, typenames: &mut HashSet<String>) {
    match data {
        Value::Object(fields) => {
            if let Some(Value::String(typename)) = fields.get("__typename") {
                typenames.insert(typename.clone());
            }
            for value in fields.values() {
                collect_typenames(value, typenames);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_typenames(item, typenames);
            }
        }
        _ => {}
    }
}

#[macro_export]
macro_rules! ext {
    ($($x: expr),*) => {
        {
            let mut typemap = $crate::ExtensionMap::new();
            $(
                typemap.insert($x);
            )*
            ::std::sync::Arc::new(typemap)
        }
    };
}
