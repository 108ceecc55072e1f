//! Document envelope, per-form payloads and the tier/form keys that partition them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants::{FINGERPRINT_PREFIX, UNSELECTED_FORM_SLUG};
use crate::errors::{Result, ValidationError};

/// Business form types with their own storage partitions and remote folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormType {
    ExpenseReport,
    PurchaseOrder,
    TravelReport,
    BaseTemplate,
}

impl FormType {
    pub const ALL: [FormType; 4] = [
        FormType::ExpenseReport,
        FormType::PurchaseOrder,
        FormType::TravelReport,
        FormType::BaseTemplate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::ExpenseReport => "expense-report",
            FormType::PurchaseOrder => "purchase-order",
            FormType::TravelReport => "travel-report",
            FormType::BaseTemplate => "base-template",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FormType::ExpenseReport => "Expense Report",
            FormType::PurchaseOrder => "Purchase Order",
            FormType::TravelReport => "Travel Report",
            FormType::BaseTemplate => "Base Template",
        }
    }

    /// Name of the remote folder holding this form's documents.
    pub fn folder_key(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = ValidationError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        FormType::ALL
            .into_iter()
            .find(|form| form.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownFormType(value.to_string()))
    }
}

/// The form type the user is working in, or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActiveForm {
    #[default]
    Unselected,
    Selected(FormType),
}

impl ActiveForm {
    pub fn form_type(&self) -> Option<FormType> {
        match self {
            ActiveForm::Unselected => None,
            ActiveForm::Selected(form) => Some(*form),
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, ActiveForm::Selected(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveForm::Unselected => UNSELECTED_FORM_SLUG,
            ActiveForm::Selected(form) => form.as_str(),
        }
    }
}

impl From<FormType> for ActiveForm {
    fn from(form: FormType) -> Self {
        ActiveForm::Selected(form)
    }
}

impl fmt::Display for ActiveForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActiveForm {
    type Err = ValidationError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == UNSELECTED_FORM_SLUG {
            return Ok(ActiveForm::Unselected);
        }
        trimmed.parse().map(ActiveForm::Selected)
    }
}

impl TryFrom<String> for ActiveForm {
    type Error = ValidationError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActiveForm> for String {
    fn from(form: ActiveForm) -> Self {
        form.as_str().to_string()
    }
}

/// Storage tier of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The single mutable document per form type.
    Workspace,
    /// Read-only, cloud-synchronized documents.
    Cache,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Workspace => "workspace",
            Tier::Cache => "cache",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "workspace" => Ok(Tier::Workspace),
            "cache" => Ok(Tier::Cache),
            other => Err(ValidationError::UnknownTier(other.to_string())),
        }
    }
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            description: String::new(),
            quantity: Decimal::ONE,
            unit_price: Decimal::ZERO,
        }
    }
}

impl LineItem {
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

fn items_total(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::total).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReport {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Default for ExpenseReport {
    fn default() -> Self {
        Self {
            vendor: String::new(),
            amount: Decimal::ZERO,
            memo: String::new(),
            items: vec![LineItem::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Default for PurchaseOrder {
    fn default() -> Self {
        Self {
            supplier: String::new(),
            delivery_date: None,
            memo: String::new(),
            items: vec![LineItem::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelReport {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Default for TravelReport {
    fn default() -> Self {
        Self {
            destination: String::new(),
            purpose: String::new(),
            start_date: None,
            end_date: None,
            memo: String::new(),
            items: vec![LineItem::default()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseTemplate {
    #[serde(default)]
    pub body: String,
}

/// Form-specific part of a document, tagged by `formType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formType", rename_all = "kebab-case")]
pub enum FormPayload {
    ExpenseReport(ExpenseReport),
    PurchaseOrder(PurchaseOrder),
    TravelReport(TravelReport),
    BaseTemplate(BaseTemplate),
    /// Placeholder shown while no form type is selected.
    #[serde(rename = "none")]
    Unselected,
}

impl FormPayload {
    pub fn blank(form_type: FormType) -> Self {
        match form_type {
            FormType::ExpenseReport => FormPayload::ExpenseReport(ExpenseReport::default()),
            FormType::PurchaseOrder => FormPayload::PurchaseOrder(PurchaseOrder::default()),
            FormType::TravelReport => FormPayload::TravelReport(TravelReport::default()),
            FormType::BaseTemplate => FormPayload::BaseTemplate(BaseTemplate::default()),
        }
    }

    pub fn form_type(&self) -> Option<FormType> {
        match self {
            FormPayload::ExpenseReport(_) => Some(FormType::ExpenseReport),
            FormPayload::PurchaseOrder(_) => Some(FormType::PurchaseOrder),
            FormPayload::TravelReport(_) => Some(FormType::TravelReport),
            FormPayload::BaseTemplate(_) => Some(FormType::BaseTemplate),
            FormPayload::Unselected => None,
        }
    }

    pub fn line_items(&self) -> &[LineItem] {
        match self {
            FormPayload::ExpenseReport(p) => &p.items,
            FormPayload::PurchaseOrder(p) => &p.items,
            FormPayload::TravelReport(p) => &p.items,
            FormPayload::BaseTemplate(_) | FormPayload::Unselected => &[],
        }
    }

    pub fn total(&self) -> Decimal {
        items_total(self.line_items())
    }
}

/// Attachment metadata carried by a document. File bytes live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A business document: common envelope plus a form-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub form: FormPayload,
    #[serde(default)]
    pub doc_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub requester: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to_workspace_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_from_cloud: bool,
    #[serde(default)]
    pub is_synced_to_cloud: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    /// Tier the document was read from. Attached on read, never persisted.
    #[serde(skip)]
    pub provenance: Option<Tier>,
}

impl Document {
    /// Fresh, unsaved document of the given form type.
    pub fn new(form_type: FormType, now: DateTime<Utc>) -> Self {
        Self::blank_with_id(Uuid::new_v4().to_string(), FormPayload::blank(form_type), now)
    }

    /// Non-persisted placeholder displayed when nothing is loaded.
    pub fn placeholder(form_type: Option<FormType>, now: DateTime<Utc>) -> Self {
        let form = form_type
            .map(FormPayload::blank)
            .unwrap_or(FormPayload::Unselected);
        Self::blank_with_id(String::new(), form, now)
    }

    fn blank_with_id(id: String, form: FormPayload, now: DateTime<Utc>) -> Self {
        Self {
            id,
            form,
            doc_number: String::new(),
            title: String::new(),
            date: Some(now.date_naive()),
            department: String::new(),
            requester: String::new(),
            created_at: now,
            updated_at: now,
            last_saved: None,
            last_modified: None,
            cloud_synced_at: None,
            uploaded_at: None,
            moved_to_workspace_at: None,
            is_draft: false,
            is_read_only: false,
            is_from_cloud: false,
            is_synced_to_cloud: false,
            cloud_file_id: None,
            cloud_modified_time: None,
            attachments: Vec::new(),
            provenance: None,
        }
    }

    pub fn form_type(&self) -> Option<FormType> {
        self.form.form_type()
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_from_workspace(&self) -> bool {
        self.provenance == Some(Tier::Workspace)
    }

    pub fn is_from_cache(&self) -> bool {
        self.provenance == Some(Tier::Cache)
    }

    pub fn with_provenance(mut self, tier: Tier) -> Self {
        self.provenance = Some(tier);
        self
    }

    /// Timestamp used for last-writer-wins comparisons.
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.last_modified.unwrap_or(self.updated_at)
    }

    /// Stamps applied on every workspace save.
    pub fn mark_workspace_save(&mut self, now: DateTime<Utc>) {
        self.last_modified = Some(now);
        self.is_draft = true;
        self.is_read_only = false;
        self.provenance = Some(Tier::Workspace);
    }

    /// Stamps applied when a document enters a tier through a move or a cache load.
    pub fn enter_tier(&mut self, tier: Tier, now: DateTime<Utc>) {
        match tier {
            Tier::Workspace => {
                self.is_read_only = false;
                self.is_draft = true;
                self.moved_to_workspace_at = Some(now);
            }
            Tier::Cache => {
                self.is_read_only = true;
                self.is_synced_to_cloud = true;
                self.cloud_synced_at = Some(now);
            }
        }
        self.provenance = Some(tier);
    }

    /// Content hash over the canonical JSON form, used for dirty tracking.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&bytes);
        Ok(format!("{}{:x}", FINGERPRINT_PREFIX, digest))
    }
}

/// Short description of a stored document, used in storage statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Per-form counts and summaries of both tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub form_type: FormType,
    pub workspace_count: usize,
    pub cache_count: usize,
    pub workspace: Vec<DocumentSummary>,
    pub cache: Vec<DocumentSummary>,
}

/// Remote identity of an uploaded document, stamped in the same write that
/// moves it into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub remote_file_id: String,
    pub remote_modified_time: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadReceipt {
    pub fn apply(&self, document: &mut Document) {
        document.uploaded_at = Some(self.uploaded_at);
        document.is_draft = false;
        document.cloud_file_id = Some(self.remote_file_id.clone());
        document.cloud_modified_time = self.remote_modified_time.clone();
    }
}
