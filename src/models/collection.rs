//! Named group of requests with its own cookie jar

use crate::constants::{COPY_SUFFIX, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use crate::cookies::CookieJar;
use crate::error::{CoreError, Result};
use crate::models::headers::HeaderList;
use crate::models::request::{Request, RequestAuth};
use crate::util::{now_epoch, truncated};

/// Names shown in lists: non-empty, bounded, single line.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.len() > MAX_NAME_LEN || name.contains(['\r', '\n', '\t']) {
        return Err(CoreError::BufferOverflow {
            field: "name",
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::BufferOverflow {
            field: "description",
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// `col_<epoch>_<4 hex chars>`
pub fn generate_collection_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("col_{}_{}", now_epoch(), &suffix[..4])
}

/// A request together with the name it is listed under
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedRequest {
    pub name: String,
    pub request: Request,
}

/// A collection of requests
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    name: String,
    description: String,
    entries: Vec<NamedRequest>,
    pub created_at: i64,
    pub modified_at: i64,
    pub cookie_jar: CookieJar,
    /// Collection-level auth used when a request does not set its own
    pub default_auth: Option<RequestAuth>,
}

impl Collection {
    pub fn new(name: &str, description: &str) -> Result<Self> {
        validate_name(name)?;
        validate_description(description)?;
        let now = now_epoch();
        Ok(Collection {
            id: generate_collection_id(),
            name: name.to_string(),
            description: description.to_string(),
            entries: Vec::new(),
            created_at: now,
            modified_at: now,
            cookie_jar: CookieJar::new(),
            default_auth: None,
        })
    }

    /// Build from persisted fields, truncating to bounds instead of failing.
    pub fn from_persisted(id: &str, name: &str, description: &str, created_at: i64, modified_at: i64) -> Self {
        let name = truncated(name, MAX_NAME_LEN).replace(['\r', '\n', '\t'], " ");
        Collection {
            id: id.to_string(),
            name: if name.trim().is_empty() { "Untitled Collection".to_string() } else { name },
            description: truncated(description, MAX_DESCRIPTION_LEN),
            entries: Vec::new(),
            created_at,
            modified_at: modified_at.max(created_at),
            cookie_jar: CookieJar::new(),
            default_auth: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = name.to_string();
        self.update_modified_time();
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> Result<()> {
        validate_description(description)?;
        self.description = description.to_string();
        self.update_modified_time();
        Ok(())
    }

    pub fn update_modified_time(&mut self) {
        self.modified_at = now_epoch().max(self.created_at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NamedRequest] {
        &self.entries
    }

    pub fn request(&self, index: usize) -> Option<&Request> {
        self.entries.get(index).map(|e| &e.request)
    }

    /// Mutable access for the sync path; callers mark the change themselves.
    pub fn request_mut(&mut self, index: usize) -> Option<&mut Request> {
        self.entries.get_mut(index).map(|e| &mut e.request)
    }

    pub fn request_name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.name.as_str())
    }

    pub fn request_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn find_request_by_name(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Append a copy of `request` under `name`, returning its index.
    ///
    /// Headers are re-added one by one under the stored-request limits, so a
    /// header that could not be loaded back is rejected here.
    pub fn add_request(&mut self, request: &Request, name: &str) -> Result<usize> {
        validate_name(name)?;
        let mut copy = request.clone();
        copy.headers = HeaderList::new();
        for header in &request.headers {
            copy.headers.add(&header.name, &header.value)?;
        }
        copy.auth.clamp_to_bounds();
        self.entries.push(NamedRequest {
            name: name.to_string(),
            request: copy,
        });
        self.update_modified_time();
        Ok(self.entries.len() - 1)
    }

    /// Append a persisted request, truncating the name instead of failing.
    pub(crate) fn push_persisted(&mut self, request: Request, name: &str) {
        let mut name = truncated(name, MAX_NAME_LEN).replace(['\r', '\n', '\t'], " ");
        if name.trim().is_empty() {
            name = format!("Request {}", self.entries.len() + 1);
        }
        self.entries.push(NamedRequest { name, request });
    }

    pub fn remove_request(&mut self, index: usize) -> Result<NamedRequest> {
        if index >= self.entries.len() {
            return Err(CoreError::invalid_index(index, self.entries.len()));
        }
        let removed = self.entries.remove(index);
        self.update_modified_time();
        Ok(removed)
    }

    pub fn duplicate_request(&mut self, index: usize) -> Result<usize> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| CoreError::invalid_index(index, self.entries.len()))?;
        let name = format!("{}{}", entry.name, COPY_SUFFIX);
        let name = truncated(&name, MAX_NAME_LEN);
        let request = entry.request.clone();
        self.add_request(&request, &name)
    }

    pub fn rename_request(&mut self, index: usize, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| CoreError::invalid_index(index, len))?;
        entry.name = new_name.to_string();
        self.update_modified_time();
        Ok(())
    }
}
