//! Implementation of `extforge build`.

use anyhow::{Context, Result};

use crate::ops::clean::clean;
use crate::ops::compile::{
    compile_tasks, compile_ui_extensions, copy_sources, install_artifact_engine, Compiler,
};
use crate::ops::externals::{cache_externals, copy_task_modules, load_externals};
use crate::ops::loc::generate_loc;
use crate::sources::SourceCache;
use crate::util::process::CommandRunner;
use crate::util::GlobalContext;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Only build these extension areas (None = everything)
    pub areas: Option<Vec<String>>,
}

/// Capabilities the pipeline runs through.
pub struct BuildTools<'a> {
    pub cache: &'a SourceCache,
    pub compiler: &'a dyn Compiler,
    pub runner: &'a dyn CommandRunner,
    /// npm program used for the ArtifactEngine install
    pub npm: &'a str,
}

/// What a build did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Unique dependencies made available in the cache
    pub dependencies: usize,
    /// Dependencies fetched by this build
    pub fetched: usize,
    pub task_modules: usize,
    pub ui_projects: usize,
    pub npm_installed: bool,
    pub task_sources: usize,
    pub loc_files: usize,
}

/// Run the full pipeline. The first failing step stops the build.
pub fn build(ctx: &GlobalContext, tools: &BuildTools<'_>, options: &BuildOptions) -> Result<BuildSummary> {
    let mut summary = BuildSummary::default();

    clean(ctx).context("clean failed")?;

    copy_sources(ctx, options.areas.as_deref()).context("failed to copy sources")?;

    let externals = load_externals(ctx)?;
    let outcomes = cache_externals(tools.cache, &externals)?;
    summary.dependencies = outcomes.len();
    summary.fetched = outcomes.iter().filter(|o| o.fresh).count();
    summary.task_modules = copy_task_modules(ctx, &externals)?.len();

    summary.ui_projects = compile_ui_extensions(ctx, tools.compiler)?;
    summary.npm_installed = install_artifact_engine(ctx, tools.runner, tools.npm)?;
    summary.task_sources = compile_tasks(ctx, tools.compiler)?;

    summary.loc_files = generate_loc(&ctx.extensions_src())
        .context("failed to generate localization resources")?
        .len();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::compile::{CompileError, CompileJob};
    use crate::sources::CacheSettings;
    use crate::test_support::{
        write_tree, zip_bytes, CommandPattern, MockExecutor, MockHttpClient, MockProcessOutput,
    };
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingCompiler {
        jobs: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Compiler for RecordingCompiler {
        fn compile(&self, job: &CompileJob) -> Result<(), CompileError> {
            self.jobs.lock().unwrap().push(job.name.clone());
            if self.fail {
                return Err(CompileError::Failed {
                    command: "tsc".to_string(),
                    code: Some(2),
                    output: "error TS1005".to_string(),
                });
            }
            Ok(())
        }
    }

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                ("tsconfig.json", "{}"),
                ("definitions/node.d.ts", ""),
                (
                    "Extensions/A/externals.json",
                    r#"{
                        "archivePackages": [ { "url": "https://example.com/lib.zip" } ],
                        "taskModule": { "0": { "type": "ps", "name": "M", "dest": "Src/Tasks/T" } }
                    }"#,
                ),
                ("Extensions/A/Src/Tasks/T/t.ts", ""),
                ("Extensions/A/Src/Tasks/T/messages.json", r#"{ "messages": { "k": "v" } }"#),
                ("Extensions/A/Src/UIExtensions/tsconfig.json", "{}"),
                ("Extensions/A/Src/UIExtensions/ui.ts", ""),
                ("Extensions/ArtifactEngine/package.json", "{}"),
                ("Extensions/ArtifactEngine/engine.ts", ""),
                ("TaskModules/ps/M/M.psm1", ""),
                ("_package/old/x.vsix", ""),
            ],
        );
        tmp
    }

    fn cache(tmp: &TempDir) -> SourceCache {
        let http = Arc::new(MockHttpClient::new());
        http.serve("https://example.com/lib.zip", zip_bytes(&[("lib.js", "")]));
        SourceCache::new(
            CacheSettings::new(tmp.path().join("_temp")),
            http,
            Arc::new(MockExecutor::new()),
        )
    }

    #[test]
    fn test_full_pipeline() {
        let tmp = project();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        let cache = cache(&tmp);
        let compiler = RecordingCompiler::default();
        let runner = MockExecutor::new().with_program("npm");
        runner.expect(CommandPattern::Exact("npm install".into()), MockProcessOutput::success(""));
        let tools = BuildTools {
            cache: &cache,
            compiler: &compiler,
            runner: &runner,
            npm: "npm",
        };

        let summary = build(&ctx, &tools, &BuildOptions::default()).unwrap();

        assert_eq!(
            summary,
            BuildSummary {
                dependencies: 1,
                fetched: 1,
                task_modules: 1,
                ui_projects: 1,
                npm_installed: true,
                task_sources: 2,
                loc_files: 1,
            }
        );
        assert_eq!(*compiler.jobs.lock().unwrap(), vec!["ui-A", "tasks"]);
        assert!(!ctx.package_dir().exists());
        assert!(ctx.build_dir().join("Extensions/A/Src/Tasks/T/M/M.psm1").is_file());
        assert!(tmp
            .path()
            .join("Extensions/A/Src/Tasks/T/Strings/resources.resjson/en-US/resources.resjson")
            .is_file());
    }

    #[test]
    fn test_compile_failure_stops_pipeline() {
        let tmp = project();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        let cache = cache(&tmp);
        let compiler = RecordingCompiler {
            fail: true,
            ..Default::default()
        };
        let runner = MockExecutor::new().with_program("npm");
        let tools = BuildTools {
            cache: &cache,
            compiler: &compiler,
            runner: &runner,
            npm: "npm",
        };

        let err = build(&ctx, &tools, &BuildOptions::default()).unwrap_err();

        assert!(format!("{:#}", err).contains("error TS1005"));
        assert!(runner.calls().is_empty());
        assert!(!tmp
            .path()
            .join("Extensions/A/Src/Tasks/T/Strings")
            .exists());
    }

    #[test]
    fn test_area_filter_limits_build() {
        let tmp = project();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        let cache = cache(&tmp);
        let compiler = RecordingCompiler::default();
        let runner = MockExecutor::new();
        let tools = BuildTools {
            cache: &cache,
            compiler: &compiler,
            runner: &runner,
            npm: "npm",
        };
        let options = BuildOptions {
            areas: Some(vec!["A".to_string()]),
        };

        let summary = build(&ctx, &tools, &options).unwrap();

        assert!(!summary.npm_installed);
        assert_eq!(summary.task_sources, 1);
        assert!(!ctx.extensions_build_dir().join("ArtifactEngine").exists());
    }
}
