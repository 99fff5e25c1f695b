//! Shader program loading, preprocessing, and uniform access
//!
//! Sources are loaded by naming convention from the configured shader root:
//! `<name>.vert`, optional `<name>.geom`, `<name>.frag`. Preprocessing
//! injects `#define` lines immediately after the version directive and
//! resolves `#include "file"` directives by recursive textual substitution,
//! skipping commented-out occurrences. Compile, link, or validate failures
//! degrade to the designated error shader (embedded sources, same pipeline)
//! so every material always receives a usable program.

use crate::gpu::{GpuError, GraphicsDevice, ProgramId, ShaderStage, UniformLocation};
use crate::render::binding;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Name under which the fallback program is compiled
pub const ERROR_SHADER_NAME: &str = "error";

/// Maximum `#include` nesting before resolution aborts
const MAX_INCLUDE_DEPTH: u8 = 8;

const ERROR_VERT_SRC: &str = "#version 330 core\n\
layout(location = 0) in vec3 inPosition;\n\
uniform mat4 modelViewProjection;\n\
void main() {\n\
    gl_Position = modelViewProjection * vec4(inPosition, 1.0);\n\
}\n";

const ERROR_FRAG_SRC: &str = "#version 330 core\n\
out vec4 fragColor;\n\
void main() {\n\
    fragColor = vec4(1.0, 0.0, 1.0, 1.0);\n\
}\n";

/// Shader loading errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// A required source file was missing or unreadable
    #[error("missing shader source '{path}': {source}")]
    MissingSource {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// An included file could not be read
    #[error("missing include '{path}': {source}")]
    MissingInclude {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Include nesting exceeded the supported depth
    #[error("include depth exceeded resolving '{0}'")]
    IncludeDepthExceeded(String),

    /// A malformed include directive
    #[error("malformed include directive: {0}")]
    MalformedInclude(String),

    /// Device-side compile/link/validate failure
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A compiled shader program with cached uniform locations
#[derive(Debug)]
pub struct Shader {
    name: String,
    program: Option<ProgramId>,
    locations: HashMap<String, Option<UniformLocation>>,
    is_error_fallback: bool,
}

impl Shader {
    /// Load a shader by name, degrading to the error shader on any failure
    pub fn load(
        device: &mut dyn GraphicsDevice,
        shader_dir: &Path,
        name: &str,
        defines: &[&str],
    ) -> Self {
        match Self::try_load(device, shader_dir, name, defines) {
            Ok(shader) => shader,
            Err(e) => {
                log::warn!("shader '{name}' failed to load ({e}); using error shader");
                Self::error_fallback(device)
            }
        }
    }

    /// Load a shader by name, reporting failure to the caller
    pub fn try_load(
        device: &mut dyn GraphicsDevice,
        shader_dir: &Path,
        name: &str,
        defines: &[&str],
    ) -> Result<Self, ShaderError> {
        let vert_path = shader_dir.join(format!("{name}.vert"));
        let frag_path = shader_dir.join(format!("{name}.frag"));
        let geom_path = shader_dir.join(format!("{name}.geom"));

        let vert = read_source(&vert_path)?;
        let frag = read_source(&frag_path)?;
        let geom = if geom_path.exists() {
            Some(read_source(&geom_path)?)
        } else {
            None
        };

        let vert = preprocess(&vert, shader_dir, defines)?;
        let frag = preprocess(&frag, shader_dir, defines)?;
        let geom = geom
            .map(|source| preprocess(&source, shader_dir, defines))
            .transpose()?;

        let mut stages = vec![(ShaderStage::Vertex, vert.as_str())];
        if let Some(geom) = &geom {
            stages.push((ShaderStage::Geometry, geom.as_str()));
        }
        stages.push((ShaderStage::Fragment, frag.as_str()));

        let program = device.compile_program(name, &stages)?;
        device.validate_program(program)?;

        let mut shader = Self {
            name: name.to_string(),
            program: Some(program),
            locations: HashMap::new(),
            is_error_fallback: false,
        };
        shader.configure_sampler_units(device);
        Ok(shader)
    }

    /// Compile the embedded error shader through the normal pipeline
    ///
    /// If even this fails the shader carries no program and every bind is a
    /// logged no-op; nothing panics.
    pub fn error_fallback(device: &mut dyn GraphicsDevice) -> Self {
        let stages = [
            (ShaderStage::Vertex, ERROR_VERT_SRC),
            (ShaderStage::Fragment, ERROR_FRAG_SRC),
        ];
        let program = match device.compile_program(ERROR_SHADER_NAME, &stages) {
            Ok(program) => Some(program),
            Err(e) => {
                log::error!("error shader itself failed to compile: {e}");
                None
            }
        };
        let mut shader = Self {
            name: ERROR_SHADER_NAME.to_string(),
            program,
            locations: HashMap::new(),
            is_error_fallback: true,
        };
        if shader.program.is_some() {
            shader.configure_sampler_units(device);
        }
        shader
    }

    /// Shader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the degraded error shader
    pub fn is_error_fallback(&self) -> bool {
        self.is_error_fallback
    }

    /// Linked program id, when compilation succeeded
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Make this program current
    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        match self.program {
            Some(program) => device.use_program(Some(program)),
            None => log::warn!("bind of unlinked shader '{}' skipped", self.name),
        }
    }

    /// Unbind any current program
    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        device.use_program(None);
    }

    /// Assign every fixed sampler uniform its contractual texture unit
    ///
    /// Programs that do not declare a given sampler have no location for it
    /// and the assignment is skipped. This table must match the units
    /// RenderManager binds textures to; both read [`binding`].
    pub fn configure_sampler_units(&mut self, device: &mut dyn GraphicsDevice) {
        self.bind(device);
        for (unit, sampler_name) in binding::all_sampler_bindings() {
            if let Some(location) = self.location(device, sampler_name) {
                device.set_uniform_i32(location, unit as i32);
            }
        }
        self.unbind(device);
    }

    /// Upload a matrix uniform by name
    pub fn set_mat4(&mut self, device: &mut dyn GraphicsDevice, name: &str, value: &crate::foundation::math::Mat4) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform_mat4(location, value);
        }
    }

    /// Upload a vec4 uniform by name
    pub fn set_vec4(&mut self, device: &mut dyn GraphicsDevice, name: &str, value: &crate::foundation::math::Vec4) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform_vec4(location, value);
        }
    }

    /// Upload a vec3 uniform by name
    pub fn set_vec3(&mut self, device: &mut dyn GraphicsDevice, name: &str, value: &crate::foundation::math::Vec3) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform_vec3(location, value);
        }
    }

    /// Upload a float uniform by name
    pub fn set_f32(&mut self, device: &mut dyn GraphicsDevice, name: &str, value: f32) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform_f32(location, value);
        }
    }

    /// Upload an integer uniform by name
    pub fn set_i32(&mut self, device: &mut dyn GraphicsDevice, name: &str, value: i32) {
        if let Some(location) = self.location(device, name) {
            device.set_uniform_i32(location, value);
        }
    }

    /// Release the program; safe to call twice
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(program) = self.program.take() {
            device.destroy_program(program);
        }
        self.locations.clear();
    }

    fn location(&mut self, device: &mut dyn GraphicsDevice, name: &str) -> Option<UniformLocation> {
        let program = self.program?;
        *self
            .locations
            .entry(name.to_string())
            .or_insert_with(|| device.uniform_location(program, name))
    }
}

/// Handle into a [`ShaderCatalog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub usize);

/// Owning catalog of compiled shaders, deduplicated by name
pub struct ShaderCatalog {
    shader_dir: std::path::PathBuf,
    shaders: Vec<Shader>,
    by_name: HashMap<String, usize>,
}

impl ShaderCatalog {
    /// Create a catalog rooted at the configured shader directory
    pub fn new(shader_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            shader_dir: shader_dir.into(),
            shaders: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Load a shader once per name; later requests return the cached handle
    pub fn load_or_get(
        &mut self,
        device: &mut dyn GraphicsDevice,
        name: &str,
        defines: &[&str],
    ) -> ShaderHandle {
        if let Some(&index) = self.by_name.get(name) {
            return ShaderHandle(index);
        }
        let shader = Shader::load(device, &self.shader_dir, name, defines);
        let index = self.shaders.len();
        self.shaders.push(shader);
        self.by_name.insert(name.to_string(), index);
        ShaderHandle(index)
    }

    /// Look up a shader by handle
    pub fn get(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle.0)
    }

    /// Mutable lookup by handle
    pub fn get_mut(&mut self, handle: ShaderHandle) -> Option<&mut Shader> {
        self.shaders.get_mut(handle.0)
    }

    /// Number of compiled shaders
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Release every program
    pub fn destroy_all(&mut self, device: &mut dyn GraphicsDevice) {
        for shader in &mut self.shaders {
            shader.destroy(device);
        }
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::MissingSource {
        path: path.display().to_string(),
        source,
    })
}

/// Run the full preprocessing pipeline over one stage's source
pub fn preprocess(source: &str, include_dir: &Path, defines: &[&str]) -> Result<String, ShaderError> {
    let with_defines = inject_defines(source, defines);
    resolve_includes(&with_defines, include_dir, MAX_INCLUDE_DEPTH)
}

/// Insert `#define` lines immediately after the version directive
pub fn inject_defines(source: &str, defines: &[&str]) -> String {
    if defines.is_empty() {
        return source.to_string();
    }
    let define_block: String = defines
        .iter()
        .map(|d| format!("#define {d}\n"))
        .collect();

    let mut out = String::with_capacity(source.len() + define_block.len());
    let mut injected = false;
    for line in source.lines() {
        out.push_str(line);
        out.push('\n');
        if !injected && line.trim_start().starts_with("#version") {
            out.push_str(&define_block);
            injected = true;
        }
    }
    if !injected {
        // No version directive; defines lead the file
        out = format!("{define_block}{out}");
    }
    out
}

/// Resolve `#include "file"` directives by recursive textual substitution
///
/// Occurrences preceded by `//` on the same line are left untouched.
pub fn resolve_includes(
    source: &str,
    include_dir: &Path,
    depth: u8,
) -> Result<String, ShaderError> {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let include_pos = line.find("#include");
        let comment_pos = line.find("//");
        let is_live_include = match (include_pos, comment_pos) {
            (Some(inc), Some(comment)) => inc < comment,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if !is_live_include {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if depth == 0 {
            return Err(ShaderError::IncludeDepthExceeded(line.to_string()));
        }

        let file = parse_include_target(line)?;
        let path = include_dir.join(&file);
        let included = std::fs::read_to_string(&path).map_err(|source| {
            ShaderError::MissingInclude {
                path: path.display().to_string(),
                source,
            }
        })?;
        let resolved = resolve_includes(&included, include_dir, depth - 1)?;
        out.push_str(&resolved);
        if !resolved.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

fn parse_include_target(line: &str) -> Result<String, ShaderError> {
    let after = &line[line.find("#include").unwrap_or(0) + "#include".len()..];
    let mut quotes = after.split('"');
    quotes.next(); // text before the opening quote
    match quotes.next() {
        Some(file) if !file.is_empty() => Ok(file.to_string()),
        _ => Err(ShaderError::MalformedInclude(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    fn temp_shader_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ember_shader_test_{tag}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_inject_defines_after_version() {
        let source = "#version 330 core\nvoid main() {}\n";
        let out = inject_defines(source, &["USE_FOG", "MAX_LIGHTS 4"]);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "#version 330 core");
        assert_eq!(lines[1], "#define USE_FOG");
        assert_eq!(lines[2], "#define MAX_LIGHTS 4");
    }

    #[test]
    fn test_inject_defines_without_version_prepends() {
        let out = inject_defines("void main() {}\n", &["FALLBACK"]);
        assert!(out.starts_with("#define FALLBACK\n"));
    }

    #[test]
    fn test_resolve_includes_substitutes_file() {
        let dir = temp_shader_dir("inc");
        std::fs::write(dir.join("common.glsl"), "float shared_fn() { return 1.0; }\n").unwrap();

        let source = "#version 330 core\n#include \"common.glsl\"\nvoid main() {}\n";
        let out = resolve_includes(source, &dir, 8).unwrap();
        assert!(out.contains("shared_fn"));
        assert!(!out.contains("#include"));
    }

    #[test]
    fn test_commented_include_is_skipped() {
        let dir = temp_shader_dir("skip");
        let source = "// #include \"does_not_exist.glsl\"\nvoid main() {}\n";
        let out = resolve_includes(source, &dir, 8).unwrap();
        assert!(out.contains("does_not_exist"));
    }

    #[test]
    fn test_include_cycle_hits_depth_limit() {
        let dir = temp_shader_dir("cycle");
        std::fs::write(dir.join("a.glsl"), "#include \"b.glsl\"\n").unwrap();
        std::fs::write(dir.join("b.glsl"), "#include \"a.glsl\"\n").unwrap();

        let result = resolve_includes("#include \"a.glsl\"\n", &dir, 8);
        assert!(matches!(result, Err(ShaderError::IncludeDepthExceeded(_))));
    }

    #[test]
    fn test_missing_files_fall_back_to_error_shader() {
        let mut device = RecordingDevice::new();
        let dir = temp_shader_dir("missing");
        let shader = Shader::load(&mut device, &dir, "lambert", &[]);
        assert!(shader.is_error_fallback());
        assert!(shader.program().is_some());
    }

    #[test]
    fn test_compile_failure_falls_back_to_error_shader() {
        let mut device = RecordingDevice::new();
        device.fail_compiles_matching("phong");
        let dir = temp_shader_dir("fail");
        std::fs::write(dir.join("phong.vert"), "#version 330 core\nvoid main() {}\n").unwrap();
        std::fs::write(dir.join("phong.frag"), "#version 330 core\nvoid main() {}\n").unwrap();

        let shader = Shader::load(&mut device, &dir, "phong", &[]);
        assert!(shader.is_error_fallback());
    }

    #[test]
    fn test_catalog_dedups_by_name() {
        let mut device = RecordingDevice::new();
        let dir = temp_shader_dir("dedup");
        let mut catalog = ShaderCatalog::new(&dir);

        let a = catalog.load_or_get(&mut device, "lambert", &[]);
        let b = catalog.load_or_get(&mut device, "lambert", &[]);
        assert_eq!(a, b);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_sampler_units_configured_after_link() {
        let mut device = RecordingDevice::new();
        let dir = temp_shader_dir("samplers");
        std::fs::write(dir.join("basic.vert"), "#version 330 core\nvoid main() {}\n").unwrap();
        std::fs::write(dir.join("basic.frag"), "#version 330 core\nvoid main() {}\n").unwrap();

        let shader = Shader::try_load(&mut device, &dir, "basic", &[]).unwrap();
        assert!(!shader.is_error_fallback());
        // One unit assignment per contractual sampler name
        let expected = crate::render::binding::all_sampler_bindings().count();
        assert_eq!(
            device.count_calls_containing("set_uniform_i32"),
            expected
        );
    }
}
