// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::fmt;

use serde_json::Value;

use crate::error::OdmError;

/// Custom conversion of one property value between entity and document
pub trait PropertyValueConverter: fmt::Debug + Send + Sync {
    /// Entity value → stored value
    fn write(&self, value: &Value) -> Result<Value, OdmError>;

    /// Stored value → entity value
    fn read(&self, value: &Value) -> Result<Value, OdmError>;
}

type ConvertFn = Box<dyn Fn(&Value) -> Result<Value, OdmError> + Send + Sync>;

/// Converter built from a pair of closures
pub struct FnConverter {
    name: &'static str,
    write: ConvertFn,
    read: ConvertFn,
}

impl FnConverter {
    pub fn new<W, R>(name: &'static str, write: W, read: R) -> Self
    where
        W: Fn(&Value) -> Result<Value, OdmError> + Send + Sync + 'static,
        R: Fn(&Value) -> Result<Value, OdmError> + Send + Sync + 'static,
    {
        Self {
            name,
            write: Box::new(write),
            read: Box::new(read),
        }
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter").field("name", &self.name).finish()
    }
}

impl PropertyValueConverter for FnConverter {
    fn write(&self, value: &Value) -> Result<Value, OdmError> {
        (self.write)(value)
    }

    fn read(&self, value: &Value) -> Result<Value, OdmError> {
        (self.read)(value)
    }
}
