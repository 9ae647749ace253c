//! The script templates and their typed argument sets.

use crate::error::{Error, Result};
use crate::escape;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Identifier of a registered script template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateId {
    /// Materialize a file from a URI or a copy source, unless it exists
    CreateOrUpdateFile,
    /// Report the metadata of a file as JSON
    GetFile,
    /// Remove every file sharing the target's base name
    DeleteFile,
}

impl TemplateId {
    /// All registered templates.
    pub const ALL: [Self; 3] = [Self::CreateOrUpdateFile, Self::GetFile, Self::DeleteFile];

    /// The template's registered name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateOrUpdateFile => "CreateOrUpdateFile",
            Self::GetFile => "GetFile",
            Self::DeleteFile => "DeleteFile",
        }
    }

    /// Whether scripts of this template change remote state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::GetFile)
    }

    pub(crate) fn body(&self) -> &'static str {
        match self {
            Self::CreateOrUpdateFile => CREATE_OR_UPDATE_FILE,
            Self::GetFile => GET_FILE,
            Self::DeleteFile => DELETE_FILE,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownTemplate(s.to_string()))
    }
}

/// Typed arguments for one template.
///
/// The variant selects the template, so a template can never be rendered
/// with another template's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArgs {
    /// Arguments of [`TemplateId::CreateOrUpdateFile`]
    CreateOrUpdateFile {
        /// URI or path to materialize the file from
        source: String,
        /// Destination path on the host
        path: String,
    },
    /// Arguments of [`TemplateId::GetFile`]
    GetFile {
        /// Path to inspect
        path: String,
    },
    /// Arguments of [`TemplateId::DeleteFile`]
    DeleteFile {
        /// Path whose base name selects the files to remove
        path: String,
    },
}

impl TemplateArgs {
    /// Arguments for creating `path` from `source`.
    pub fn create_or_update(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self::CreateOrUpdateFile {
            source: source.into(),
            path: path.into(),
        }
    }

    /// Arguments for reading `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::GetFile { path: path.into() }
    }

    /// Arguments for deleting `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::DeleteFile { path: path.into() }
    }

    /// The template these arguments belong to.
    pub fn template_id(&self) -> TemplateId {
        match self {
            Self::CreateOrUpdateFile { .. } => TemplateId::CreateOrUpdateFile,
            Self::GetFile { .. } => TemplateId::GetFile,
            Self::DeleteFile { .. } => TemplateId::DeleteFile,
        }
    }

    /// Named fields in template order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::CreateOrUpdateFile { source, path } => {
                vec![("source", source.as_str()), ("path", path.as_str())]
            }
            Self::GetFile { path } | Self::DeleteFile { path } => vec![("path", path.as_str())],
        }
    }

    /// Check every field can be embedded.
    pub fn validate(&self) -> Result<()> {
        let template = self.template_id().name();
        for (field, value) in self.fields() {
            escape::check(template, field, value)?;
        }
        Ok(())
    }
}

const CREATE_OR_UPDATE_FILE: &str = r#"$ErrorActionPreference = 'Stop'

$source = '{{source}}'
$path = '{{path}}'

function Test-HttpUri {
    param([string] $Value)
    $uri = $Value -as [System.Uri]
    $null -ne $uri -and $uri.IsAbsoluteUri -and ($uri.Scheme -eq 'http' -or $uri.Scheme -eq 'https')
}

if (-not (Test-Path -LiteralPath $path)) {
    $directory = [System.IO.Path]::GetDirectoryName($path)
    if ($directory -and -not (Test-Path -LiteralPath $directory)) {
        New-Item -ItemType Directory -Force -Path $directory | Out-Null
    }

    if (Test-HttpUri $source) {
        $client = New-Object System.Net.WebClient
        try {
            $client.DownloadFile($source, $path)
        }
        finally {
            $client.Dispose()
        }
    }
    else {
        Copy-Item -LiteralPath $source -Destination $path -Force
    }
}
"#;

const GET_FILE: &str = r#"$ErrorActionPreference = 'Stop'

$path = '{{path}}'

$items = @()
if (Test-Path -LiteralPath $path) {
    $items = @(Get-ChildItem -LiteralPath $path -Force | ForEach-Object {
        [ordered]@{
            Path = $_.FullName
            Name = $_.Name
            Size = $_.Length
            DirName = $_.DirectoryName
            Exists = $_.Exists
            CreationTime = [string]$_.CreationTime
            LastWriteTime = [string]$_.LastWriteTime
        }
    })
}

if ($items.Count -eq 1) {
    ConvertTo-Json -InputObject $items[0] -Compress
}
elseif ($items.Count -gt 1) {
    ConvertTo-Json -InputObject $items -Compress
}
else {
    '{"Exists": false}'
}
"#;

const DELETE_FILE: &str = r#"$ErrorActionPreference = 'Stop'

$path = '{{path}}'

$targetDirectory = Split-Path -Path $path -Parent
$targetName = [System.IO.Path]::GetFileNameWithoutExtension($path)

if ($targetDirectory -and $targetName -and (Test-Path -LiteralPath $targetDirectory)) {
    Get-ChildItem -LiteralPath $targetDirectory -File |
        Where-Object { $_.BaseName.StartsWith($targetName) } |
        ForEach-Object { Remove-Item -LiteralPath $_.FullName -Force }
}
"#;
