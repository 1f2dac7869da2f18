//! Markdown documents attached to registrations, notices and audits.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::analysis::types::{AuditReport, DmcaNotice, RepoData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LicenseType {
    #[serde(rename = "MIT")]
    Mit,
    #[serde(rename = "Apache-2.0")]
    Apache2,
    #[serde(rename = "GPL-3.0")]
    Gpl3,
    #[serde(rename = "BSD-3-Clause")]
    Bsd3Clause,
    #[serde(rename = "Custom-AI")]
    CustomAi,
}

impl LicenseType {
    pub const ALL: [LicenseType; 5] = [
        LicenseType::Mit,
        LicenseType::Apache2,
        LicenseType::Gpl3,
        LicenseType::Bsd3Clause,
        LicenseType::CustomAi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Mit => "MIT",
            LicenseType::Apache2 => "Apache-2.0",
            LicenseType::Gpl3 => "GPL-3.0",
            LicenseType::Bsd3Clause => "BSD-3-Clause",
            LicenseType::CustomAi => "Custom-AI",
        }
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown license type '{}'. Expected one of: {}",
                    s,
                    Self::ALL.map(|l| l.as_str()).join(", ")
                )
            })
    }
}

fn license_body(license: LicenseType, holder: &str, year: i32) -> String {
    match license {
        LicenseType::Mit => format!(
            "Copyright (c) {year} {holder}\n\n\
             Permission is hereby granted, free of charge, to any person obtaining a copy of this \
             software and associated documentation files (the \"Software\"), to deal in the Software \
             without restriction, including without limitation the rights to use, copy, modify, merge, \
             publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons \
             to whom the Software is furnished to do so, subject to the following conditions:\n\n\
             The above copyright notice and this permission notice shall be included in all copies or \
             substantial portions of the Software.\n\n\
             THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED."
        ),
        LicenseType::Apache2 => format!(
            "Copyright {year} {holder}\n\n\
             Licensed under the Apache License, Version 2.0 (the \"License\"); you may not use this \
             file except in compliance with the License. You may obtain a copy of the License at\n\n\
             http://www.apache.org/licenses/LICENSE-2.0\n\n\
             Unless required by applicable law or agreed to in writing, software distributed under the \
             License is distributed on an \"AS IS\" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND."
        ),
        LicenseType::Gpl3 => format!(
            "Copyright (C) {year} {holder}\n\n\
             This program is free software: you can redistribute it and/or modify it under the terms of \
             the GNU General Public License as published by the Free Software Foundation, either version 3 \
             of the License, or (at your option) any later version.\n\n\
             This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY. \
             See <https://www.gnu.org/licenses/> for the full text."
        ),
        LicenseType::Bsd3Clause => format!(
            "Copyright (c) {year}, {holder}\n\n\
             Redistribution and use in source and binary forms, with or without modification, are \
             permitted provided that the following conditions are met:\n\n\
             1. Redistributions of source code must retain the above copyright notice.\n\
             2. Redistributions in binary form must reproduce the above copyright notice.\n\
             3. Neither the name of the copyright holder nor the names of its contributors may be used \
             to endorse or promote products derived from this software without specific prior written \
             permission."
        ),
        LicenseType::CustomAi => format!(
            "Copyright (c) {year} {holder}\n\n\
             Use, copying and modification of this software by humans is permitted under the terms of \
             the MIT license.\n\n\
             Use of this software, in whole or in part, to train, fine-tune or evaluate machine learning \
             models, or its inclusion in any training dataset, is prohibited without prior written \
             permission from the copyright holder."
        ),
    }
}

/// License document bound to a repository snapshot.
pub fn render_license(url: &str, license: LicenseType, repo: &RepoData) -> String {
    let now = chrono::Utc::now();
    let holder = if repo.owner.is_empty() { "the repository owner" } else { repo.owner.as_str() };

    let mut doc = String::new();
    let _ = writeln!(doc, "# {} License\n", license);
    let _ = writeln!(doc, "**Repository:** {}  ", url);
    let _ = writeln!(doc, "**Owner:** {}  ", holder);
    if !repo.language.is_empty() {
        let _ = writeln!(doc, "**Language:** {}  ", repo.language);
    }
    let _ = writeln!(doc, "**Generated:** {}\n", now.to_rfc3339());
    let _ = writeln!(doc, "{}\n", license_body(license, holder, chrono::Datelike::year(&now)));
    let _ = writeln!(doc, "---\n");
    let _ = writeln!(
        doc,
        "This license is registered on the Filecoin Calibration network. The on-chain record \
         references this document by its IPFS content identifier."
    );
    doc
}

pub fn render_dmca_notice(notice: &DmcaNotice) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "# DMCA Takedown Notice\n");
    let _ = writeln!(doc, "**Notice ID:** {}  ", notice.notice_id);
    let _ = writeln!(doc, "**Date:** {}\n", notice.timestamp);
    let _ = writeln!(doc, "## Copyrighted work\n");
    let _ = writeln!(doc, "- Repository: {}", notice.original_url);
    let _ = writeln!(doc, "- On-chain registration ID: {}", notice.original_repo_id);
    let _ = writeln!(doc, "- Owner: {}", notice.owner);
    let _ = writeln!(doc, "- License: {}\n", notice.license_type);
    let _ = writeln!(doc, "## Infringing material\n");
    let _ = writeln!(doc, "- Location: {}", notice.infringing_url);
    let _ = writeln!(doc, "- Similarity score: {:.2}%\n", notice.similarity_score * 100.0);

    let _ = writeln!(doc, "## Evidence\n");
    if notice.evidence.is_empty() {
        let _ = writeln!(doc, "No individual file matches were recorded.\n");
    } else {
        let _ = writeln!(doc, "| File | Similarity |");
        let _ = writeln!(doc, "|------|------------|");
        for item in &notice.evidence {
            let _ = writeln!(doc, "| `{}` | {:.2}% |", item.path, item.similarity * 100.0);
        }
        let _ = writeln!(doc);
    }
    let _ = writeln!(doc, "Evidence hash (sha256): `{}`\n", notice.evidence_hash);

    let _ = writeln!(doc, "## Statement\n");
    let _ = writeln!(
        doc,
        "I have a good faith belief that use of the material in the manner complained of is not \
         authorized by the copyright owner, its agent, or the law. The information in this notice \
         is accurate, and under penalty of perjury, I am authorized to act on behalf of the owner \
         of the copyright that is allegedly infringed."
    );
    doc
}

pub fn render_audit_report(audit: &AuditReport) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "# Security Audit Report\n");
    let _ = writeln!(doc, "**Audit ID:** {}  ", audit.audit_id);
    let _ = writeln!(doc, "**Repository:** {}  ", audit.url);
    let _ = writeln!(doc, "**Date:** {}\n", audit.timestamp);

    let _ = writeln!(doc, "## Summary\n");
    let _ = writeln!(doc, "{}\n", audit.summary);
    let _ = writeln!(doc, "| Files scanned | Commits scanned | Critical | High | Medium | Low |");
    let _ = writeln!(doc, "|---|---|---|---|---|---|");
    let _ = writeln!(
        doc,
        "| {} | {} | {} | {} | {} | {} |\n",
        audit.files_scanned,
        audit.commits_scanned,
        audit.severity.critical,
        audit.severity.high,
        audit.severity.medium,
        audit.severity.low
    );

    let _ = writeln!(doc, "## Findings\n");
    if audit.findings.is_empty() {
        let _ = writeln!(doc, "No findings.");
    }
    let mut findings: Vec<_> = audit.findings.iter().collect();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    for finding in findings {
        let _ = writeln!(
            doc,
            "- **{}** `{}:{}` {}: `{}`. {}",
            finding.severity.as_str().to_uppercase(),
            finding.file_path,
            finding.line_number,
            finding.description,
            finding.matched_text.replace('`', "'"),
            finding.recommendation
        );
    }
    doc
}

/// Replace characters that are invalid in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        "unnamed_file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write `body` to `dir/<sanitized name>`, creating `dir` when needed.
pub async fn write_document(dir: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(sanitize_filename(name));
    tokio::fs::write(&path, body).await?;
    tracing::debug!(path = %path.display(), bytes = body.len(), "Document written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{FileMatch, SeverityCounts};

    #[test]
    fn test_license_type_parse() {
        assert_eq!("mit".parse::<LicenseType>().unwrap(), LicenseType::Mit);
        assert_eq!(" Apache-2.0 ".parse::<LicenseType>().unwrap(), LicenseType::Apache2);
        assert_eq!("custom-ai".parse::<LicenseType>().unwrap(), LicenseType::CustomAi);
        let err = "WTFPL".parse::<LicenseType>().unwrap_err();
        assert!(err.contains("BSD-3-Clause"));
    }

    #[test]
    fn test_render_license() {
        let repo = RepoData {
            owner: "acme".into(),
            language: "Rust".into(),
            ..RepoData::default()
        };
        let doc = render_license("https://github.com/acme/widget", LicenseType::CustomAi, &repo);
        assert!(doc.starts_with("# Custom-AI License"));
        assert!(doc.contains("https://github.com/acme/widget"));
        assert!(doc.contains("acme"));
        assert!(doc.contains("machine learning"));
    }

    #[test]
    fn test_render_dmca_notice() {
        let notice = DmcaNotice {
            notice_id: "dmca_1".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            original_repo_id: 7,
            original_url: "https://github.com/acme/widget".into(),
            owner: "0xabc".into(),
            license_type: "MIT".into(),
            infringing_url: "https://github.com/copy/widget".into(),
            similarity_score: 0.875,
            evidence: vec![FileMatch {
                path: "src/lib.rs".into(),
                similarity: 0.9,
            }],
            evidence_hash: "deadbeef".into(),
        };
        let doc = render_dmca_notice(&notice);
        assert!(doc.contains("87.50%"));
        assert!(doc.contains("| `src/lib.rs` | 90.00% |"));
        assert!(doc.contains("registration ID: 7"));
        assert!(doc.contains("`deadbeef`"));
    }

    #[test]
    fn test_render_empty_audit() {
        let audit = AuditReport {
            audit_id: "audit_1".into(),
            timestamp: "now".into(),
            url: "https://github.com/a/b".into(),
            files_scanned: 3,
            commits_scanned: 0,
            total_findings: 0,
            severity: SeverityCounts::default(),
            findings: Vec::new(),
            summary: "No security findings.".into(),
        };
        let doc = render_audit_report(&audit);
        assert!(doc.contains("| 3 | 0 | 0 | 0 | 0 | 0 |"));
        assert!(doc.contains("No findings."));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("LICENSE_a/b:c.md"), "LICENSE_a_b_c.md");
        assert_eq!(sanitize_filename(" ..hidden. "), "hidden");
        assert_eq!(sanitize_filename("..."), "unnamed_file");
    }

    #[tokio::test]
    async fn test_write_document() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports");
        let path = write_document(&nested, "dmca/notice?.md", "body").await.unwrap();
        assert_eq!(path.file_name().unwrap(), "dmca_notice_.md");
        assert_eq!(tokio::fs::read_to_string(path).await.unwrap(), "body");
    }
}
