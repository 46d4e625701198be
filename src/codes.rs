//! Room code index
//!
//! Issues short shareable codes and resolves them back to room names.
//! Codes never expire.

use std::collections::HashMap;

use crate::error::AppError;
use crate::types::RoomCode;

#[derive(Debug, Default)]
pub struct CodeIndex {
    codes: HashMap<RoomCode, String>,
}

impl CodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a code that is not currently bound
    pub fn generate(&self) -> RoomCode {
        loop {
            let code = RoomCode::generate();
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }

    /// Bind a code to a room
    pub fn bind(&mut self, code: RoomCode, room_name: &str) -> Result<(), AppError> {
        if self.codes.contains_key(&code) {
            return Err(AppError::CodeCollision(code.0));
        }
        self.codes.insert(code, room_name.to_string());
        Ok(())
    }

    /// Generate and bind in one step
    ///
    /// Holding `&mut self` across both makes the check-and-insert atomic.
    pub fn issue(&mut self, room_name: &str) -> RoomCode {
        let code = self.generate();
        self.codes.insert(code.clone(), room_name.to_string());
        code
    }

    pub fn resolve(&self, code: &RoomCode) -> Result<&str, AppError> {
        self.codes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| AppError::InvalidCode(code.0.clone()))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
