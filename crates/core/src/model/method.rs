use callscope_protocol::MethodId;
use serde::{Deserialize, Serialize};

/// The method a captured node invoked.
///
/// Aggregates merge on [`MethodModel::id`], which is the fully qualified
/// name: `class.name` followed by the signature when those are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMethod", into = "RawMethod")]
pub struct MethodModel {
    id: MethodId,
    name: String,
    class_name: Option<String>,
    signature: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RawMethod {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

impl MethodModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::qualified(name, None::<String>, None::<String>)
    }

    pub fn qualified(
        name: impl Into<String>,
        class_name: Option<impl Into<String>>,
        signature: Option<impl Into<String>>,
    ) -> Self {
        let name = name.into();
        let class_name = class_name.map(Into::into);
        let signature = signature.map(Into::into);
        let mut full = match &class_name {
            Some(class) if !name.is_empty() => format!("{class}.{name}"),
            _ => name.clone(),
        };
        if let Some(sig) = &signature {
            full.push_str(sig);
        }
        Self {
            id: MethodId::from(full),
            name,
            class_name,
            signature,
        }
    }

    /// Placeholder model for anchors that do not correspond to a method.
    pub fn synthetic() -> Self {
        Self::new("")
    }

    pub fn id(&self) -> &MethodId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }
}

impl From<RawMethod> for MethodModel {
    fn from(raw: RawMethod) -> Self {
        Self::qualified(raw.name, raw.class_name, raw.signature)
    }
}

impl From<MethodModel> for RawMethod {
    fn from(model: MethodModel) -> Self {
        Self {
            name: model.name,
            class_name: model.class_name,
            signature: model.signature,
        }
    }
}
