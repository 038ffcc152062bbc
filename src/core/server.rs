//! Execution server types and deployment strategies.
//!
//! Each server type deploys compiled artifacts differently. The choice of
//! invocation depends only on the server type and on whether the payload was
//! written as script text or as base64, so it is captured once in
//! [`Deployment`] and shared by every encoder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of execution server a target deploys to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerType {
    /// SAS 9 with the Stored Process server
    #[serde(rename = "SAS9", alias = "sas9")]
    Sas9,
    /// SAS Viya job execution service
    #[serde(rename = "SASVIYA", alias = "sasviya", alias = "viya")]
    SasViya,
    /// SASjs server, deployed by uploading the artifact tree
    #[serde(rename = "SASJS", alias = "sasjs")]
    Sasjs,
}

impl ServerType {
    /// Get the server type as it appears in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Sas9 => "SAS9",
            ServerType::SasViya => "SASVIYA",
            ServerType::Sasjs => "SASJS",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SAS9" => Ok(ServerType::Sas9),
            "SASVIYA" | "VIYA" => Ok(ServerType::SasViya),
            "SASJS" => Ok(ServerType::Sasjs),
            _ => Err(format!(
                "invalid server type '{}'; expected 'SAS9', 'SASVIYA', or 'SASJS'",
                s
            )),
        }
    }
}

/// How an artifact's payload is written into the deployment script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadEncoding {
    /// Literal script text, one `put` per line
    Text,
    /// Base64 of the raw bytes, chunked
    Base64,
}

impl PayloadEncoding {
    /// Script-type files are written as text; everything else as base64.
    pub fn for_file_name(name: &str) -> Self {
        if is_script_file(name) {
            PayloadEncoding::Text
        } else {
            PayloadEncoding::Base64
        }
    }
}

/// Whether a file name denotes a macro-language script.
pub fn is_script_file(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".sas")
}

/// The deployment statement appended after an artifact's data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// SAS 9 stored process from script text
    Sas9Service,
    /// SAS 9 document from base64 content
    Sas9Document,
    /// Viya job definition from script text
    ViyaService,
    /// Viya file from base64 content
    ViyaFile,
    /// Deployment happens out-of-band (no statement)
    OutOfBand,
}

impl Deployment {
    /// Select the deployment strategy for a server type and payload encoding.
    pub fn select(server_type: ServerType, encoding: PayloadEncoding) -> Self {
        match (server_type, encoding) {
            (ServerType::Sas9, PayloadEncoding::Text) => Deployment::Sas9Service,
            (ServerType::Sas9, PayloadEncoding::Base64) => Deployment::Sas9Document,
            (ServerType::SasViya, PayloadEncoding::Text) => Deployment::ViyaService,
            (ServerType::SasViya, PayloadEncoding::Base64) => Deployment::ViyaFile,
            (ServerType::Sasjs, _) => Deployment::OutOfBand,
        }
    }

    /// Render the invocation statement, or `None` for out-of-band deployment.
    ///
    /// The statement references the `&appLoc`, `&path` and `&service` macro
    /// variables and the `sascode` fileref set up by the script emitter.
    pub fn invocation(&self) -> Option<&'static str> {
        match self {
            Deployment::Sas9Service => Some(
                "%mm_createwebservice(path=&appLoc/&path, name=&service, code=sascode, replace=YES)",
            ),
            Deployment::Sas9Document => Some(
                "%mm_createdocument(tree=&appLoc/&path, name=&service, inref=sascode, intype=BASE64)",
            ),
            Deployment::ViyaService => Some(
                "%mv_createwebservice(path=&appLoc/&path, name=&service, code=sascode, replace=YES)",
            ),
            Deployment::ViyaFile => Some(
                "%mv_createfile(path=&appLoc/&path, name=&service, inref=sascode, intype=BASE64)",
            ),
            Deployment::OutOfBand => None,
        }
    }
}
