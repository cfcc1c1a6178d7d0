//! Create new project directories from the template project.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use include_dir::{Dir, include_dir};
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::{
    config::ProjectsSettings,
    domain::{error::DomainError, project::ProjectName},
};

static EMBEDDED_TEMPLATE: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates/default");

/// Files copied from the template project, relative to the project directory.
pub const TEMPLATE_FILES: [&str; 3] = ["src/project.ts", "src/example.tsx", "src/global.css"];

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    InvalidName(#[from] DomainError),
    #[error("project `{name}` already exists at `{}`", .path.display())]
    AlreadyExists { name: String, path: PathBuf },
    #[error("failed to write `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode `{file}`")]
    Encode {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ScaffoldReport {
    pub name: ProjectName,
    pub directory: PathBuf,
    pub created: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PackageManifest<'a> {
    name: String,
    version: &'a str,
    private: bool,
    scripts: PackageScripts<'a>,
}

#[derive(Debug, Serialize)]
struct PackageScripts<'a> {
    dev: &'a str,
    build: &'a str,
    render: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TsConfig<'a> {
    extends: &'a str,
    compiler_options: TsCompilerOptions<'a>,
    include: [&'a str; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TsCompilerOptions<'a> {
    out_dir: &'a str,
}

#[derive(Debug, Clone)]
pub struct ProjectScaffolder {
    root: PathBuf,
    template_dir: PathBuf,
}

impl ProjectScaffolder {
    pub fn new(settings: &ProjectsSettings) -> Self {
        Self {
            root: settings.root.clone(),
            template_dir: settings.root.join(&settings.template),
        }
    }

    /// Materialise `<root>/<name>` with template sources and build files.
    ///
    /// Template files are taken from the on-disk template project when present
    /// there, otherwise from the template bundled with the binary.
    pub async fn create(&self, name: &str) -> Result<ScaffoldReport, ScaffoldError> {
        let name = ProjectName::parse(name)?;
        let directory = self.root.join(name.as_str());

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| io_error(&self.root, source))?;
        match fs::create_dir(&directory).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(ScaffoldError::AlreadyExists {
                    name: name.into_inner(),
                    path: directory,
                });
            }
            Err(source) => return Err(io_error(&directory, source)),
        }
        let src = directory.join("src");
        fs::create_dir(&src)
            .await
            .map_err(|source| io_error(&src, source))?;

        let mut created = Vec::new();
        for file in TEMPLATE_FILES {
            let Some(contents) = self.template_contents(file).await? else {
                continue;
            };
            let destination = directory.join(file);
            write_file(&destination, &contents).await?;
            created.push(destination);
        }

        let package = serde_json::to_string_pretty(&package_manifest(&name)).map_err(|source| {
            ScaffoldError::Encode {
                file: "package.json",
                source,
            }
        })?;
        let destination = directory.join("package.json");
        write_file(&destination, package.as_bytes()).await?;
        created.push(destination);

        let tsconfig = serde_json::to_string_pretty(&ts_config()).map_err(|source| {
            ScaffoldError::Encode {
                file: "tsconfig.json",
                source,
            }
        })?;
        let destination = directory.join("tsconfig.json");
        write_file(&destination, tsconfig.as_bytes()).await?;
        created.push(destination);

        let destination = directory.join("vite.config.ts");
        write_file(&destination, vite_config(&name).as_bytes()).await?;
        created.push(destination);

        info!(
            target = "application::scaffold",
            project = name.as_str(),
            directory = %directory.display(),
            files = created.len(),
            "project scaffolded"
        );

        Ok(ScaffoldReport {
            name,
            directory,
            created,
        })
    }

    async fn template_contents(&self, file: &str) -> Result<Option<Vec<u8>>, ScaffoldError> {
        let on_disk = self.template_dir.join(file);
        match fs::read(&on_disk).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(EMBEDDED_TEMPLATE
                .get_file(file)
                .map(|embedded| embedded.contents().to_vec())),
            Err(source) => Err(io_error(&on_disk, source)),
        }
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), ScaffoldError> {
    fs::write(path, contents)
        .await
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> ScaffoldError {
    ScaffoldError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn package_manifest(name: &ProjectName) -> PackageManifest<'static> {
    PackageManifest {
        name: format!("revideo-{name}"),
        version: "1.0.0",
        private: true,
        scripts: PackageScripts {
            dev: "vite",
            build: "tsc && vite build",
            render: "tsc && node dist/render.js",
        },
    }
}

fn ts_config() -> TsConfig<'static> {
    TsConfig {
        extends: "../../tsconfig.json",
        compiler_options: TsCompilerOptions { out_dir: "./dist" },
        include: ["src/**/*"],
    }
}

fn vite_config(name: &ProjectName) -> String {
    format!(
        "import {{defineConfig}} from 'vite';\n\
         \n\
         export default defineConfig({{\n  \
           build: {{\n    \
             lib: {{\n      \
               entry: './src/project.ts',\n      \
               name: '{name}',\n      \
               fileName: 'project',\n    \
             }},\n  \
           }},\n\
         }});\n"
    )
}
