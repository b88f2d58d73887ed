//! Renderers for bills, refund certificates and tabular reports.
//!
//! The workbook (`xlsx` feature) and document (`pdf` feature) renderers are
//! optional. Which ones exist is decided once, when an [`Exporter`] is built;
//! a missing renderer answers [`RenderOutcome::Unavailable`] and the caller
//! falls back to the [`text`] reports.

pub mod currency;
pub mod reports;
pub mod text;

#[cfg(feature = "pdf")]
pub mod document;
#[cfg(feature = "xlsx")]
pub mod workbook;

use chrono::Local;
use tracing::{debug, warn};

use crate::compute::bill::BillDraft;
use crate::error::Error;
use reports::{EmdCertificate, ProjectReport, SecurityRefund, TableData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(Vec<u8>),
    Unavailable,
}

impl RenderOutcome {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            RenderOutcome::Rendered(bytes) => Some(bytes),
            RenderOutcome::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCapabilities {
    workbook: bool,
    document: bool,
}

impl ExportCapabilities {
    /// Renderers compiled into this build.
    pub fn detect() -> Self {
        Self {
            workbook: cfg!(feature = "xlsx"),
            document: cfg!(feature = "pdf"),
        }
    }

    /// Plain-text output only, regardless of features.
    pub fn text_only() -> Self {
        Self {
            workbook: false,
            document: false,
        }
    }

    pub fn workbook(&self) -> bool {
        self.workbook
    }

    pub fn document(&self) -> bool {
        self.document
    }
}

pub struct Exporter {
    capabilities: ExportCapabilities,
}

impl Exporter {
    pub fn new(capabilities: ExportCapabilities) -> Self {
        if !capabilities.workbook {
            warn!("Workbook export unavailable; falling back to text reports");
        }
        if !capabilities.document {
            warn!("PDF export unavailable; falling back to text reports");
        }
        Self { capabilities }
    }

    pub fn detect() -> Self {
        Self::new(ExportCapabilities::detect())
    }

    pub fn capabilities(&self) -> ExportCapabilities {
        self.capabilities
    }

    fn stamp() -> String {
        currency::generated_on(Local::now())
    }

    fn outcome(bytes: Option<Vec<u8>>, what: &str) -> RenderOutcome {
        match bytes {
            Some(bytes) => {
                debug!("Rendered {} ({} bytes)", what, bytes.len());
                RenderOutcome::Rendered(bytes)
            }
            None => RenderOutcome::Unavailable,
        }
    }

    pub fn bill_workbook(&self, draft: &BillDraft) -> Result<RenderOutcome, Error> {
        if !self.capabilities.workbook {
            return Ok(RenderOutcome::Unavailable);
        }
        #[cfg(feature = "xlsx")]
        let bytes = Some(workbook::bill_workbook(draft, &Self::stamp())?);
        #[cfg(not(feature = "xlsx"))]
        let bytes: Option<Vec<u8>> = {
            let _ = draft;
            None
        };
        Ok(Self::outcome(bytes, "bill workbook"))
    }

    pub fn table_workbook(&self, title: &str, table: &TableData) -> Result<RenderOutcome, Error> {
        if !self.capabilities.workbook {
            return Ok(RenderOutcome::Unavailable);
        }
        #[cfg(feature = "xlsx")]
        let bytes = Some(workbook::table_workbook(title, table, &Self::stamp())?);
        #[cfg(not(feature = "xlsx"))]
        let bytes: Option<Vec<u8>> = {
            let _ = (title, table);
            None
        };
        Ok(Self::outcome(bytes, "table workbook"))
    }

    pub fn bill_document(&self, draft: &BillDraft) -> Result<RenderOutcome, Error> {
        if !self.capabilities.document {
            return Ok(RenderOutcome::Unavailable);
        }
        #[cfg(feature = "pdf")]
        let bytes = Some(document::bill_document(draft, &Self::stamp())?);
        #[cfg(not(feature = "pdf"))]
        let bytes: Option<Vec<u8>> = {
            let _ = draft;
            None
        };
        Ok(Self::outcome(bytes, "bill document"))
    }

    pub fn emd_certificate(&self, cert: &EmdCertificate) -> Result<RenderOutcome, Error> {
        if !self.capabilities.document {
            return Ok(RenderOutcome::Unavailable);
        }
        #[cfg(feature = "pdf")]
        let bytes = Some(document::emd_certificate(cert, &Self::stamp())?);
        #[cfg(not(feature = "pdf"))]
        let bytes: Option<Vec<u8>> = {
            let _ = cert;
            None
        };
        Ok(Self::outcome(bytes, "EMD certificate"))
    }

    pub fn security_refund(&self, refund: &SecurityRefund) -> Result<RenderOutcome, Error> {
        if !self.capabilities.document {
            return Ok(RenderOutcome::Unavailable);
        }
        #[cfg(feature = "pdf")]
        let bytes = Some(document::security_refund(refund, &Self::stamp())?);
        #[cfg(not(feature = "pdf"))]
        let bytes: Option<Vec<u8>> = {
            let _ = refund;
            None
        };
        Ok(Self::outcome(bytes, "security refund"))
    }

    pub fn project_report(&self, report: &ProjectReport) -> Result<RenderOutcome, Error> {
        if !self.capabilities.document {
            return Ok(RenderOutcome::Unavailable);
        }
        #[cfg(feature = "pdf")]
        let bytes = Some(document::project_report(report, &Self::stamp())?);
        #[cfg(not(feature = "pdf"))]
        let bytes: Option<Vec<u8>> = {
            let _ = report;
            None
        };
        Ok(Self::outcome(bytes, "project report"))
    }

    pub fn bill_text(&self, draft: &BillDraft) -> String {
        text::bill_report(draft, &Self::stamp())
    }

    pub fn emd_text(&self, cert: &EmdCertificate) -> String {
        text::emd_report(cert, &Self::stamp())
    }

    pub fn security_refund_text(&self, refund: &SecurityRefund) -> String {
        text::security_refund_report(refund, &Self::stamp())
    }

    pub fn project_text(&self, report: &ProjectReport) -> String {
        text::project_report(report, &Self::stamp())
    }
}
