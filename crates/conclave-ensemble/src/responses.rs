use conclave_llm::ModelResponse;

/// Successful responses from one fan-out, keyed by backend name.
///
/// Entries are kept in registry order regardless of completion order, so
/// every fold over them is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsembleResponses {
    entries: Vec<(String, ModelResponse)>,
}

impl EnsembleResponses {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response. A repeated name replaces the earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, response: ModelResponse) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = response,
            None => self.entries.push((name, response)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModelResponse> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, response)| response)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelResponse)> {
        self.entries
            .iter()
            .map(|(name, response)| (name.as_str(), response))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for EnsembleResponses {
    type Item = (String, ModelResponse);
    type IntoIter = std::vec::IntoIter<(String, ModelResponse)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, ModelResponse)> for EnsembleResponses {
    fn from_iter<I: IntoIterator<Item = (String, ModelResponse)>>(iter: I) -> Self {
        let mut responses = Self::new();
        for (name, response) in iter {
            responses.insert(name, response);
        }
        responses
    }
}
