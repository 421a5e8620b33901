use include_dir::{include_dir, Dir};
use rand::Rng;
use serde::Deserialize;

use crate::error::{Error, Result};

static TEXT_DIR: Dir = include_dir!("src/texts");

pub const DEFAULT_SET: &str = "english";

/// A named set of reference texts bundled with the binary.
#[derive(Deserialize, Clone, Debug)]
pub struct Passages {
    pub name: String,
    pub passages: Vec<String>,
}

impl Passages {
    pub fn load() -> Result<Self> {
        Self::load_set(DEFAULT_SET)
    }

    pub fn load_set(name: &str) -> Result<Self> {
        let file_name = format!("{name}.json");
        let file = TEXT_DIR
            .get_file(&file_name)
            .ok_or_else(|| Error::Passages(format!("{file_name} not found")))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| Error::Passages(format!("{file_name} is not valid utf-8")))?;

        let set: Passages = serde_json::from_str(contents)?;
        if set.passages.is_empty() {
            return Err(Error::Passages(format!("{file_name} has no passages")));
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.passages.get(index).map(String::as_str)
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.passages[rng.gen_range(0..self.passages.len())]
    }
}
