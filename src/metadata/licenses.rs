//! Supported package licenses.
//!
//! Each license has an intellectual-rights text for the descriptive record
//! and a plain-text file that is uploaded into the package as `LICENSE`.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct License {
    /// SPDX identifier.
    pub id: &'static str,
    /// File name inside the license directory.
    pub file_name: &'static str,
    /// Text placed in the descriptive record's intellectual-rights section.
    pub rights_text: &'static str,
}

impl License {
    pub fn path_in(&self, license_dir: &Path) -> PathBuf {
        license_dir.join(self.file_name)
    }
}

pub const SUPPORTED_LICENSES: &[License] = &[
    License {
        id: "CC0-1.0",
        file_name: "cc0.txt",
        rights_text: "This work is dedicated to the public domain under the Creative \
            Commons Universal 1.0 Public Domain Dedication. To view a copy of this \
            dedication, visit https://creativecommons.org/publicdomain/zero/1.0/.",
    },
    License {
        id: "CC-BY-3.0",
        file_name: "ccby3.txt",
        rights_text: "This work is dedicated to the public domain under the Creative \
            Commons license CC-BY 3.0. To view a copy of this dedication, visit \
            https://creativecommons.org/licenses/by/3.0/us/legalcode.",
    },
    License {
        id: "CC-BY-4.0",
        file_name: "ccby4.txt",
        rights_text: "This information is released to the public domain under the \
            Creative Commons license CC-BY 4.0 (see: \
            https://creativecommons.org/licenses/by/4.0/). It may be distributed, \
            remixed, and built upon. You must give appropriate credit, provide a \
            reasonable manner, but not in any way that suggests the licensor endorses \
            you or your use. The consumer of these data (\"Data User\" herein) should \
            realize that these data may be actively used by others for ongoing research \
            and that coordination may be necessary to prevent duplicate publication. \
            The Data User is urged to contact the authors of these data if any \
            questions about methodology or results occur. Where appropriate, the Data \
            User is encouraged to consider collaboration or co-authorship with the \
            authors. The Data User should realize that misinterpretation of data may \
            occur if used out of context of the original study. While substantial \
            efforts are made to ensure the accuracy of data and associated \
            documentation, complete accuracy of data sets cannot be guaranteed. All \
            data are made available \"as is.\" The Data User should be aware, however, \
            that data are updated periodically and it is the responsibility of the Data \
            User to check for new versions of the data. The data authors and the \
            repository where these data were obtained shall not be liable for damages \
            resulting from any use or misinterpretation of the data. Thank you.",
    },
];

pub fn find_license(id: &str) -> Option<&'static License> {
    SUPPORTED_LICENSES.iter().find(|license| license.id == id)
}

/// Intellectual-rights text for `id`; empty for unknown ids.
pub fn rights_text(id: &str) -> &'static str {
    find_license(id).map(|license| license.rights_text).unwrap_or("")
}
