//! Document Tree Service
//!
//! The knowledge base is a tree of folders and documents rooted at a
//! sentinel folder that always exists. Documents are stored flat in
//! insertion order; the hierarchy lives in `parent_id`.

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::models::{new_id, Attachment, AttachmentKind, DocId, DocKind, Document};

/// Id of the root folder
pub const ROOT_ID: &str = "root";

const ROOT_TITLE: &str = "通用文档";
const UNTITLED: &str = "未命名文档";
const PLACEHOLDER_CONTENT: &str = "# 新文档\n\n开始输入...";

/// Everything needed to attach an uploaded file. The blob itself stays
/// with the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub mime: String,
    pub blob_ref: String,
}

/// A line of the rendered outline
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry<'a> {
    pub depth: usize,
    pub doc: &'a Document,
}

/// The knowledge base tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<Document>", into = "Vec<Document>")]
pub struct DocumentTree {
    docs: Vec<Document>,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    /// Creates a tree holding only the root folder
    pub fn new() -> Self {
        Self {
            docs: vec![Document {
                id: ROOT_ID.to_string(),
                parent_id: None,
                title: ROOT_TITLE.to_string(),
                content: String::new(),
                kind: DocKind::Folder,
                attachments: Vec::new(),
                last_modified: Utc::now(),
            }],
        }
    }

    /// Builds a tree from a flat list, validating ids and parent links
    ///
    /// The root folder is added if the list does not contain it.
    pub fn from_documents(docs: Vec<Document>) -> CoreResult<Self> {
        let mut tree = Self::new();
        let mut roots = docs.iter().filter(|d| d.id == ROOT_ID);
        let root = roots.next();
        if roots.next().is_some() {
            return Err(CoreError::duplicate("document", ROOT_ID));
        }
        if let Some(root) = root {
            if root.parent_id.is_some() || !root.is_folder() {
                return Err(CoreError::InvalidParent(ROOT_ID.to_string()));
            }
            tree.docs[0] = root.clone();
        }

        for doc in docs.into_iter().filter(|d| d.id != ROOT_ID) {
            if tree.get(&doc.id).is_some() {
                return Err(CoreError::duplicate("document", &doc.id));
            }
            tree.docs.push(doc);
        }

        tree.validate()?;
        Ok(tree)
    }

    /// Checks that every non-root node hangs off an existing folder and that
    /// attachment ids are unique within their document
    pub fn validate(&self) -> CoreResult<()> {
        check_attachments(self.root())?;
        for doc in self.docs.iter().filter(|d| d.id != ROOT_ID) {
            let parent_id = doc
                .parent_id
                .as_deref()
                .ok_or_else(|| CoreError::InvalidParent(doc.id.clone()))?;
            let parent = self
                .get(parent_id)
                .ok_or_else(|| CoreError::not_found("document", parent_id))?;
            if !parent.is_folder() {
                return Err(CoreError::InvalidParent(parent_id.to_string()));
            }
            // every node must reach the root
            self.ancestors(&doc.id)?;
            check_attachments(doc)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn root(&self) -> &Document {
        &self.docs[0]
    }

    /// All nodes in insertion order, root first
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Direct children of `id`, in insertion order
    pub fn children(&self, id: &str) -> Vec<&Document> {
        self.docs
            .iter()
            .filter(|d| d.parent_id.as_deref() == Some(id))
            .collect()
    }

    /// Ids from the parent of `id` up to the root
    ///
    /// Fails with `CycleDetected` if the parent chain loops.
    pub fn ancestors(&self, id: &str) -> CoreResult<Vec<DocId>> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([id]);
        let mut current = self
            .get(id)
            .ok_or_else(|| CoreError::not_found("document", id))?;

        while let Some(parent_id) = current.parent_id.as_deref() {
            if !seen.insert(parent_id) {
                return Err(CoreError::CycleDetected {
                    id: id.to_string(),
                    parent: parent_id.to_string(),
                });
            }
            chain.push(parent_id.to_string());
            current = self
                .get(parent_id)
                .ok_or_else(|| CoreError::not_found("document", parent_id))?;
        }
        Ok(chain)
    }

    /// Depth-first listing of the tree for rendering, root at depth 0
    pub fn outline(&self) -> Vec<OutlineEntry<'_>> {
        let mut out = Vec::with_capacity(self.docs.len());
        let mut visited = HashSet::new();
        let mut stack = vec![(self.root(), 0usize)];

        while let Some((doc, depth)) = stack.pop() {
            if !visited.insert(doc.id.as_str()) {
                continue;
            }
            out.push(OutlineEntry { depth, doc });
            for child in self.children(&doc.id).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Creates a document under `parent_id`
    ///
    /// Without a title the document gets the untitled placeholder. The body
    /// always starts with placeholder content.
    pub fn create(&self, parent_id: &str, title: Option<&str>) -> CoreResult<(Self, DocId)> {
        let title = title.filter(|t| !t.trim().is_empty()).unwrap_or(UNTITLED);
        self.insert_node(parent_id, title, DocKind::Document, PLACEHOLDER_CONTENT)
    }

    /// Creates an empty folder under `parent_id`
    pub fn create_folder(&self, parent_id: &str, title: &str) -> CoreResult<(Self, DocId)> {
        self.insert_node(parent_id, title, DocKind::Folder, "")
    }

    /// Inserts a fully-built node, failing on id collision
    pub fn insert(&self, doc: Document) -> CoreResult<Self> {
        if self.get(&doc.id).is_some() {
            return Err(CoreError::duplicate("document", &doc.id));
        }
        let parent_id = doc
            .parent_id
            .clone()
            .ok_or_else(|| CoreError::InvalidParent(doc.id.clone()))?;
        self.require_folder(&parent_id)?;
        check_attachments(&doc)?;

        let mut next = self.clone();
        next.docs.push(doc);
        Ok(next)
    }

    fn insert_node(
        &self,
        parent_id: &str,
        title: &str,
        kind: DocKind,
        content: &str,
    ) -> CoreResult<(Self, DocId)> {
        let doc = Document {
            id: new_id("d"),
            parent_id: Some(parent_id.to_string()),
            title: title.to_string(),
            content: content.to_string(),
            kind,
            attachments: Vec::new(),
            last_modified: Utc::now(),
        };
        let id = doc.id.clone();
        let next = self.insert(doc)?;
        debug!("Created {:?} {} under {}", kind, id, parent_id);
        Ok((next, id))
    }

    /// Replaces the body of a document
    pub fn update_content(&self, id: &str, content: &str) -> CoreResult<Self> {
        self.modify(id, |doc| {
            doc.content = content.to_string();
            Ok(())
        })
    }

    /// Replaces the title of a node
    pub fn rename(&self, id: &str, title: &str) -> CoreResult<Self> {
        self.modify(id, |doc| {
            doc.title = title.to_string();
            Ok(())
        })
    }

    /// Attaches an uploaded file, classifying it by MIME type
    pub fn add_attachment(&self, id: &str, upload: &Upload) -> CoreResult<(Self, Attachment)> {
        let attachment = Attachment {
            id: new_id("a"),
            name: upload.name.clone(),
            kind: AttachmentKind::from_mime(&upload.mime),
            url: upload.blob_ref.clone(),
        };
        let next = self.modify(id, |doc| {
            doc.attachments.push(attachment.clone());
            Ok(())
        })?;
        Ok((next, attachment))
    }

    /// Moves a node under a new parent folder
    pub fn reparent(&self, id: &str, new_parent: &str) -> CoreResult<Self> {
        if id == ROOT_ID {
            return Err(CoreError::InvalidParent(ROOT_ID.to_string()));
        }
        if self.get(id).is_none() {
            return Err(CoreError::not_found("document", id));
        }
        self.require_folder(new_parent)?;

        let cycle = new_parent == id || self.ancestors(new_parent)?.iter().any(|a| a == id);
        if cycle {
            return Err(CoreError::CycleDetected {
                id: id.to_string(),
                parent: new_parent.to_string(),
            });
        }

        self.modify(id, |doc| {
            doc.parent_id = Some(new_parent.to_string());
            Ok(())
        })
    }

    /// Removes a node and, for folders, everything beneath it
    pub fn remove(&self, id: &str) -> CoreResult<Self> {
        if id == ROOT_ID {
            return Err(CoreError::RootNotDeletable);
        }
        if self.get(id).is_none() {
            return Err(CoreError::not_found("document", id));
        }

        let mut doomed: HashSet<String> = HashSet::from([id.to_string()]);
        let mut frontier = vec![id.to_string()];
        while let Some(current) = frontier.pop() {
            for child in self.children(&current) {
                if doomed.insert(child.id.clone()) {
                    frontier.push(child.id.clone());
                }
            }
        }

        debug!("Removing {} node(s) starting at {}", doomed.len(), id);
        let mut next = self.clone();
        next.docs.retain(|d| !doomed.contains(&d.id));
        Ok(next)
    }

    fn require_folder(&self, id: &str) -> CoreResult<()> {
        let parent = self
            .get(id)
            .ok_or_else(|| CoreError::not_found("document", id))?;
        if !parent.is_folder() {
            return Err(CoreError::InvalidParent(id.to_string()));
        }
        Ok(())
    }

    fn modify<F>(&self, id: &str, change: F) -> CoreResult<Self>
    where
        F: FnOnce(&mut Document) -> CoreResult<()>,
    {
        let pos = self
            .docs
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CoreError::not_found("document", id))?;

        let mut next = self.clone();
        let doc = &mut next.docs[pos];
        change(doc)?;
        doc.touch();
        Ok(next)
    }
}

/// Attachment ids are unique within their document
fn check_attachments(doc: &Document) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for attachment in &doc.attachments {
        if !seen.insert(attachment.id.as_str()) {
            return Err(CoreError::duplicate("attachment", &attachment.id));
        }
    }
    Ok(())
}

/// Actions accepted by the document tree reducer
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentAction {
    Create {
        parent_id: DocId,
        title: Option<String>,
    },
    CreateFolder {
        parent_id: DocId,
        title: String,
    },
    Insert(Document),
    UpdateContent {
        id: DocId,
        content: String,
    },
    Rename {
        id: DocId,
        title: String,
    },
    Attach {
        id: DocId,
        upload: Upload,
    },
    Reparent {
        id: DocId,
        parent_id: DocId,
    },
    Remove(DocId),
}

impl DocumentTree {
    /// Reduces the tree, returning the new tree
    pub fn apply(&self, action: DocumentAction) -> CoreResult<Self> {
        match action {
            DocumentAction::Create { parent_id, title } => {
                Ok(self.create(&parent_id, title.as_deref())?.0)
            }
            DocumentAction::CreateFolder { parent_id, title } => {
                Ok(self.create_folder(&parent_id, &title)?.0)
            }
            DocumentAction::Insert(doc) => self.insert(doc),
            DocumentAction::UpdateContent { id, content } => self.update_content(&id, &content),
            DocumentAction::Rename { id, title } => self.rename(&id, &title),
            DocumentAction::Attach { id, upload } => Ok(self.add_attachment(&id, &upload)?.0),
            DocumentAction::Reparent { id, parent_id } => self.reparent(&id, &parent_id),
            DocumentAction::Remove(id) => self.remove(&id),
        }
    }
}

impl TryFrom<Vec<Document>> for DocumentTree {
    type Error = CoreError;

    fn try_from(docs: Vec<Document>) -> Result<Self, Self::Error> {
        Self::from_documents(docs)
    }
}

impl From<DocumentTree> for Vec<Document> {
    fn from(tree: DocumentTree) -> Self {
        tree.docs
    }
}
