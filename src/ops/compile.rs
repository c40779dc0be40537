//! Source staging and TypeScript compilation.
//!
//! Sources are copied into `_build` first and compiled there, so the
//! source tree never receives generated JavaScript.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use thiserror::Error;

use crate::util::fs::{copy_dir_all, ensure_dir, glob_files, list_subdirs, relative_path};
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::GlobalContext;

/// Extension directory that holds shared code rather than an extension.
pub const COMMON_DIR: &str = "Common";

/// Extension whose node dependencies are installed before task compilation.
pub const ARTIFACT_ENGINE_DIR: &str = "ArtifactEngine";

/// Error while running an external compiler or installer.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("`{tool}` not found in PATH")]
    ToolNotFound { tool: String },

    #[error("`{command}` failed with exit code {code:?}\n{output}")]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to write compiler project {}: {source}", path.display())]
    Project {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One TypeScript compilation.
///
/// `files` are compiled with the options of `base_config`. Outputs keep
/// their path relative to `root_dir`, placed under `out_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Short name, used for the generated project file
    pub name: String,
    /// tsconfig.json whose compiler options apply
    pub base_config: PathBuf,
    /// Input files
    pub files: Vec<PathBuf>,
    /// Common root of the non-declaration inputs
    pub root_dir: PathBuf,
    /// Output directory
    pub out_dir: PathBuf,
    /// Where the generated project file is written
    pub project_path: PathBuf,
}

/// Compiles TypeScript.
pub trait Compiler: Send + Sync {
    /// Run one compilation to completion.
    fn compile(&self, job: &CompileJob) -> Result<(), CompileError>;
}

/// `tsc` driven through a generated project file that extends the real one.
pub struct TscCompiler {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl TscCompiler {
    /// Create a compiler that runs `program`.
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        TscCompiler {
            program: program.into(),
            runner,
        }
    }

    /// Render the generated project file for a job.
    pub fn project_json(job: &CompileJob) -> serde_json::Value {
        let files: Vec<String> = job
            .files
            .iter()
            .map(|f| f.to_string_lossy().into_owned())
            .collect();

        serde_json::json!({
            "extends": job.base_config.to_string_lossy(),
            "compilerOptions": {
                "rootDir": job.root_dir.to_string_lossy(),
                "outDir": job.out_dir.to_string_lossy(),
            },
            "files": files,
            "include": [],
        })
    }
}

impl Compiler for TscCompiler {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileError> {
        let tsc = self
            .runner
            .find(&self.program)
            .ok_or_else(|| CompileError::ToolNotFound {
                tool: self.program.clone(),
            })?;

        let project_err = |source| CompileError::Project {
            path: job.project_path.clone(),
            source,
        };
        if let Some(parent) = job.project_path.parent() {
            std::fs::create_dir_all(parent).map_err(project_err)?;
        }
        let contents = serde_json::to_string_pretty(&Self::project_json(job))
            .map_err(|e| project_err(e.into()))?;
        std::fs::write(&job.project_path, contents).map_err(project_err)?;

        let cmd = ProcessBuilder::new(&tsc).arg("-p").arg(&job.project_path);
        run_checked(self.runner.as_ref(), &cmd)
    }
}

/// Run a command, turning a spawn failure or non-zero exit into `Failed`.
pub(crate) fn run_checked(runner: &dyn CommandRunner, cmd: &ProcessBuilder) -> Result<(), CompileError> {
    let failed = |code, output| CompileError::Failed {
        command: cmd.display_command(),
        code,
        output,
    };

    let output = runner
        .run(cmd)
        .map_err(|e| failed(None, format!("{:#}", e)))?;

    if !output.stdout.trim().is_empty() {
        tracing::debug!("{}", output.stdout.trim_end());
    }

    if !output.success() {
        // tsc reports diagnostics on stdout.
        let mut combined = output.stdout;
        combined.push_str(&output.stderr);
        return Err(failed(output.status, combined.trim_end().to_string()));
    }
    Ok(())
}

/// Split a comma separated area list. Blank entries are dropped.
pub fn parse_area_filter(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Copy sources into `_build`, preserving their layout.
///
/// Without a filter `definitions/` and `Extensions/` are copied whole. With
/// a filter only `Extensions/<area>` for each listed area is copied; an
/// empty filter leaves an empty `_build/Extensions`.
pub fn copy_sources(ctx: &GlobalContext, areas: Option<&[String]>) -> Result<()> {
    let build = ctx.build_dir();

    let Some(areas) = areas else {
        for src in [ctx.definitions_dir(), ctx.extensions_src()] {
            if src.is_dir() {
                let dst = build.join(relative_path(ctx.cwd(), &src));
                copy_dir_all(&src, &dst).with_context(|| {
                    format!("failed to copy {} to {}", src.display(), dst.display())
                })?;
            }
        }
        return Ok(());
    };

    let extensions_out = ctx.extensions_build_dir();
    ensure_dir(&extensions_out)?;

    if areas.is_empty() {
        tracing::info!("No module is updated with given change-set");
        return Ok(());
    }

    tracing::info!("Compiling updated modules - {}", areas.join(","));
    for area in areas {
        let src = ctx.extensions_src().join(area);
        if !src.is_dir() {
            tracing::warn!("Area `{}` does not exist under {}", area, ctx.extensions_src().display());
            continue;
        }
        let dst = extensions_out.join(area);
        copy_dir_all(&src, &dst)
            .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    }

    Ok(())
}

/// Built extensions, excluding the shared `Common` directory.
pub fn built_extensions(ctx: &GlobalContext) -> Result<Vec<String>> {
    Ok(list_subdirs(&ctx.extensions_build_dir())?
        .into_iter()
        .filter(|name| name != COMMON_DIR)
        .collect())
}

/// Compile every extension's `Src/UIExtensions` project in place.
///
/// Returns the number of projects compiled.
pub fn compile_ui_extensions(ctx: &GlobalContext, compiler: &dyn Compiler) -> Result<usize> {
    let mut compiled = 0;

    for ext in built_extensions(ctx)? {
        let ui_dir = ctx.extensions_build_dir().join(&ext).join("Src").join("UIExtensions");
        let tsconfig = ui_dir.join("tsconfig.json");
        if !tsconfig.is_file() {
            continue;
        }

        let files: Vec<PathBuf> = glob_files(&ui_dir, &["**/*.ts".to_string()])?
            .into_iter()
            .filter(|f| !has_component(f, "node_modules"))
            .collect();
        if files.is_empty() {
            continue;
        }

        tracing::info!("Compiling UI extension {}", ext);
        let job = CompileJob {
            name: format!("ui-{}", ext),
            base_config: tsconfig,
            files,
            root_dir: ui_dir.clone(),
            out_dir: ui_dir,
            project_path: generated_project_path(ctx, &format!("ui-{}", ext)),
        };
        compiler
            .compile(&job)
            .with_context(|| format!("failed to compile UI extensions of `{}`", ext))?;
        compiled += 1;
    }

    Ok(compiled)
}

/// Run `npm install` in the built ArtifactEngine, if it has a package.json.
///
/// Returns true if npm was run.
pub fn install_artifact_engine(
    ctx: &GlobalContext,
    runner: &dyn CommandRunner,
    npm: &str,
) -> Result<bool> {
    let dir = ctx.extensions_build_dir().join(ARTIFACT_ENGINE_DIR);
    if !dir.join("package.json").is_file() {
        return Ok(false);
    }

    let npm_path = runner.find(npm).ok_or_else(|| CompileError::ToolNotFound {
        tool: npm.to_string(),
    })?;
    let cmd = ProcessBuilder::new(npm_path).arg("install").cwd(&dir);
    run_checked(runner, &cmd).with_context(|| format!("npm install failed in {}", dir.display()))?;

    Ok(true)
}

/// Collect the task and ArtifactEngine sources to compile.
pub fn task_sources(ctx: &GlobalContext) -> Result<Vec<PathBuf>> {
    let built = ctx.extensions_build_dir();
    let excluded = built.join(ARTIFACT_ENGINE_DIR).join("definitions");

    let patterns = [
        "**/Tasks/**/*.ts".to_string(),
        format!("**/{}/**/*.ts", ARTIFACT_ENGINE_DIR),
    ];

    let files: BTreeSet<PathBuf> = glob_files(&built, &patterns)?
        .into_iter()
        .filter(|f| !has_component(f, "node_modules") && !f.starts_with(&excluded))
        .collect();

    Ok(files.into_iter().collect())
}

/// Compile task sources with the project tsconfig, in place under
/// `_build/Extensions`.
///
/// Returns the number of input files.
pub fn compile_tasks(ctx: &GlobalContext, compiler: &dyn Compiler) -> Result<usize> {
    let sources = task_sources(ctx)?;
    if sources.is_empty() {
        tracing::info!("No task sources to compile");
        return Ok(0);
    }

    let tsconfig = ctx.tsconfig_path();
    if !tsconfig.is_file() {
        bail!("{} not found; it is required to compile tasks", tsconfig.display());
    }

    let mut files = glob_files(&ctx.definitions_dir(), &["*.d.ts".to_string()])?;
    let count = sources.len();
    files.extend(sources);

    let out_dir = ctx.extensions_build_dir();
    let job = CompileJob {
        name: "tasks".to_string(),
        base_config: tsconfig,
        files,
        root_dir: out_dir.clone(),
        out_dir,
        project_path: generated_project_path(ctx, "tasks"),
    };

    tracing::info!("Compiling {} task sources", count);
    compiler.compile(&job).context("failed to compile tasks")?;

    Ok(count)
}

fn generated_project_path(ctx: &GlobalContext, name: &str) -> PathBuf {
    ctx.build_dir()
        .join(".tsconfig")
        .join(format!("{}.json", name))
}

fn has_component(path: &Path, name: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(n) if n == name))
}
