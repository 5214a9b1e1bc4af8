//! Files generated by the pipeline rather than taken from storage.

/// A package member the pipeline creates itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraFile {
    /// The package-info document (`tale.yml`).
    TaleConfig,
    /// The license text.
    License,
    /// The re-hosted compute environment archive.
    Environment,
}

impl ExtraFile {
    /// The generated member uploaded as `file_name`, if any.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        [ExtraFile::TaleConfig, ExtraFile::License, ExtraFile::Environment]
            .into_iter()
            .find(|file| file.file_name() == file_name)
    }

    /// Label used for upload metrics.
    pub fn metric_kind(&self) -> &'static str {
        match self {
            ExtraFile::TaleConfig => "package_info",
            ExtraFile::License => "license",
            ExtraFile::Environment => "environment",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExtraFile::TaleConfig => "tale.yml",
            ExtraFile::License => "LICENSE",
            ExtraFile::Environment => "docker-environment.tar.gz",
        }
    }

    /// Format id used in the descriptive record's entry for this file.
    pub fn record_format(&self) -> &'static str {
        match self {
            ExtraFile::TaleConfig => "application/x-yaml",
            ExtraFile::License => "text/plain",
            ExtraFile::Environment => "application/tar+gzip",
        }
    }

    /// Format id the object is uploaded with.
    pub fn upload_format(&self) -> &'static str {
        match self {
            ExtraFile::TaleConfig | ExtraFile::License => "text/plain",
            ExtraFile::Environment => "application/tar+gzip",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExtraFile::TaleConfig => {
                "A configuration file, holding information that is needed to \
                 reproduce the compute environment."
            }
            ExtraFile::License => "The package's licensing information.",
            ExtraFile::Environment => {
                "Holds the dockerfile and additional configurations for the \
                 underlying compute environment. This environment was used as the \
                 base image, and includes the IDE that is used while running the Tale."
            }
        }
    }
}
