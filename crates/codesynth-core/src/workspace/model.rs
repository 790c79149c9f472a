use serde::{Deserialize, Serialize};

/// A source file uploaded by the user.
///
/// `name` is the unique key within a session. Documents are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Original filename
    pub name: String,
    /// Full text content
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Ordered set of documents, keyed by name, kept in add-order.
///
/// Mutated only by [`DocumentSet::add_all`] (duplicates skipped) or [`DocumentSet::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSet {
    documents: Vec<Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every document whose name is not yet held, including duplicates
    /// within `incoming` itself (first one wins).
    ///
    /// # Returns
    ///
    /// The number of documents actually added.
    pub fn add_all<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Document>,
    {
        let before = self.documents.len();
        for document in incoming {
            if !self.contains(&document.name) {
                self.documents.push(document);
            }
        }
        self.documents.len() - before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.iter().any(|d| d.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.name == name)
    }

    pub fn first(&self) -> Option<&Document> {
        self.documents.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}

impl FromIterator<Document> for DocumentSet {
    fn from_iter<T: IntoIterator<Item = Document>>(iter: T) -> Self {
        let mut set = DocumentSet::new();
        set.add_all(iter);
        set
    }
}
