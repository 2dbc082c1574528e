//! A single GLSL shader stage with `#define` injection.
//!
//! Definitions are emitted as `#define NAME VALUE` lines ahead of the source
//! (after a leading `#version` line, which GLSL requires to come first).
//! External definitions passed at compile time override definitions of the
//! same name, so integrators can retune shader constants without editing the
//! source.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gl::Gl;

/// One `#define` injected ahead of shader source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderDefinition {
    /// Macro name.
    pub name: String,
    /// Macro body; `None` defines a bare flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ShaderDefinition {
    /// `#define name value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// `#define name`.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    fn line(&self) -> String {
        match &self.value {
            Some(value) => format!("#define {} {value}", self.name),
            None => format!("#define {}", self.name),
        }
    }
}

/// Pipeline stage of a [`Shader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderKind {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

impl ShaderKind {
    /// GL shader type enum.
    #[must_use]
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

/// A shader stage, compiled lazily on first use.
///
/// One shader may be attached to several programs; it is compiled once.
pub struct Shader<G: Gl> {
    kind: ShaderKind,
    source: String,
    definitions: Vec<ShaderDefinition>,
    handle: Option<G::Shader>,
}

impl<G: Gl> Shader<G> {
    /// Create a shader stage without definitions.
    pub fn new(kind: ShaderKind, source: impl Into<String>) -> Self {
        Self::with_definitions(kind, source, Vec::new())
    }

    /// Create a shader stage whose source is prefixed with `definitions`.
    pub fn with_definitions(
        kind: ShaderKind,
        source: impl Into<String>,
        definitions: Vec<ShaderDefinition>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            definitions,
            handle: None,
        }
    }

    /// Pipeline stage.
    #[must_use]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// Current definitions, including any merged external ones.
    #[must_use]
    pub fn definitions(&self) -> &[ShaderDefinition] {
        &self.definitions
    }

    /// The full text handed to the compiler.
    #[must_use]
    pub fn code(&self) -> String {
        assemble(&self.definitions, &self.source)
    }

    /// The compiled shader object, compiling it on first call.
    ///
    /// `external` definitions are merged in before compiling; they are
    /// ignored once the shader has been compiled.
    ///
    /// # Safety
    ///
    /// Requires a valid, current GL context.
    ///
    /// # Errors
    ///
    /// [`Error::ContextLost`] if no shader object could be created and
    /// [`Error::ShaderCompile`] with the driver log if compilation fails.
    pub unsafe fn get(
        &mut self,
        gl: &G,
        external: Option<&[ShaderDefinition]>,
    ) -> Result<G::Shader> {
        if let Some(shader) = self.handle {
            return Ok(shader);
        }
        if let Some(external) = external {
            self.combine_definitions(external);
        }
        let shader = unsafe { self.compile(gl) }?;
        self.handle = Some(shader);
        Ok(shader)
    }

    /// Delete the shader object. Safe to call repeatedly.
    ///
    /// # Safety
    ///
    /// `gl` must be the context the shader was compiled with.
    pub unsafe fn remove(&mut self, gl: &G) {
        if let Some(shader) = self.handle.take() {
            unsafe { gl.delete_shader(shader) };
        }
    }

    unsafe fn compile(&self, gl: &G) -> Result<G::Shader> {
        let created = unsafe { gl.create_shader(self.kind.gl_enum()) };
        let context_lost = unsafe { gl.is_context_lost() };

        let shader = match created {
            Ok(shader) if !context_lost => shader,
            Ok(shader) => {
                unsafe { gl.delete_shader(shader) };
                return Err(Error::ContextLost {
                    shader_null: false,
                    context_lost,
                });
            }
            Err(_) => {
                return Err(Error::ContextLost {
                    shader_null: true,
                    context_lost,
                })
            }
        };

        let code = self.code();
        unsafe {
            gl.shader_source(shader, &code);
            gl.compile_shader(shader);

            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(Error::ShaderCompile(annotate_compile_error(&log, &code)));
            }
        }

        Ok(shader)
    }

    fn combine_definitions(&mut self, external: &[ShaderDefinition]) {
        for definition in external {
            match self
                .definitions
                .iter_mut()
                .find(|existing| existing.name == definition.name)
            {
                Some(existing) => existing.value.clone_from(&definition.value),
                None => self.definitions.push(definition.clone()),
            }
        }
    }
}

/// Join definitions and source, keeping a leading `#version` line first.
fn assemble(definitions: &[ShaderDefinition], source: &str) -> String {
    let mut lines: Vec<String> = definitions.iter().map(ShaderDefinition::line).collect();

    let body = match source.split_once('\n') {
        Some((first, rest)) if first.contains("#version") => {
            lines.insert(0, first.to_owned());
            rest
        }
        None if source.contains("#version") => {
            lines.insert(0, source.to_owned());
            ""
        }
        _ => source,
    };

    lines.push(body.to_owned());
    lines.join("\n")
}

/// Rewrite a leading `ERROR: <col>:<row>: <message>` log line to include the
/// source line it points at.
fn annotate_compile_error(log: &str, code: &str) -> String {
    if log.trim().is_empty() {
        return "Unknown shader compilation error".to_owned();
    }

    let Some((first, rest)) = log.split_once('\n') else {
        return log.to_owned();
    };
    let Some(location) = first.strip_prefix("ERROR:") else {
        return log.to_owned();
    };
    let mut parts = location.trim_start().splitn(3, ':');
    let (Some(col), Some(row), Some(message)) = (parts.next(), parts.next(), parts.next()) else {
        return log.to_owned();
    };
    let (Ok(_), Ok(row_number)) = (col.trim().parse::<u32>(), row.trim().parse::<usize>()) else {
        return log.to_owned();
    };

    match row_number
        .checked_sub(1)
        .and_then(|index| code.lines().nth(index))
    {
        Some(line) => format!(
            "ERROR {}:{}: {}\nErroneous line: <<{line}>>\n{rest}",
            col.trim(),
            row.trim(),
            message.trim_start()
        ),
        None => log.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingGl};

    const SOURCE: &str = "void main() {\n    gl_FragColor = vec4(SPAN);\n}";

    #[test]
    fn definitions_precede_source() {
        let shader = Shader::<RecordingGl>::with_definitions(
            ShaderKind::Fragment,
            SOURCE,
            vec![ShaderDefinition::new("SPAN", "8.0"), ShaderDefinition::flag("FAST")],
        );
        assert_eq!(
            shader.code(),
            "#define SPAN 8.0\n#define FAST\nvoid main() {\n    gl_FragColor = vec4(SPAN);\n}"
        );
    }

    #[test]
    fn version_line_stays_first() {
        let shader = Shader::<RecordingGl>::with_definitions(
            ShaderKind::Vertex,
            "#version 300 es\nvoid main() {}",
            vec![ShaderDefinition::flag("A")],
        );
        assert_eq!(shader.code(), "#version 300 es\n#define A\nvoid main() {}");
    }

    #[test]
    fn external_definitions_override_existing() {
        let gl = RecordingGl::new();
        let mut shader = Shader::<RecordingGl>::with_definitions(
            ShaderKind::Fragment,
            SOURCE,
            vec![ShaderDefinition::new("SPAN", "8.0")],
        );
        let external = [
            ShaderDefinition::new("SPAN", "4.0"),
            ShaderDefinition::flag("EXTRA"),
        ];
        unsafe { shader.get(&gl, Some(&external)) }.unwrap();

        assert_eq!(
            shader.definitions(),
            &[ShaderDefinition::new("SPAN", "4.0"), ShaderDefinition::flag("EXTRA")]
        );
        assert!(gl.calls().iter().any(|call| matches!(
            call,
            Call::ShaderSource { source, .. } if source.starts_with("#define SPAN 4.0\n#define EXTRA\n")
        )));
    }

    #[test]
    fn compiles_once() {
        let gl = RecordingGl::new();
        let mut shader = Shader::<RecordingGl>::new(ShaderKind::Vertex, SOURCE);
        let first = unsafe { shader.get(&gl, None) }.unwrap();
        let second = unsafe { shader.get(&gl, None) }.unwrap();
        assert_eq!(first, second);
        assert_eq!(gl.count(|call| matches!(call, Call::CompileShader(_))), 1);
    }

    #[test]
    fn compile_error_names_erroneous_line() {
        let gl = RecordingGl::new();
        gl.fail_compile("ERROR: 0:2: 'SPAN' : undeclared identifier\nERROR: 1 compilation errors.");
        let mut shader = Shader::<RecordingGl>::new(ShaderKind::Fragment, SOURCE);

        let err = unsafe { shader.get(&gl, None) }.unwrap_err();
        let Error::ShaderCompile(message) = err else {
            panic!("unexpected error {err:?}");
        };
        assert!(message.starts_with("ERROR 0:2: 'SPAN' : undeclared identifier\n"));
        assert!(message.contains("Erroneous line: <<    gl_FragColor = vec4(SPAN);>>"));
        assert!(message.ends_with("ERROR: 1 compilation errors."));
        assert_eq!(gl.count(|call| matches!(call, Call::DeleteShader(_))), 1);
    }

    #[test]
    fn empty_compile_log_reports_unknown_error() {
        assert_eq!(
            annotate_compile_error("", SOURCE),
            "Unknown shader compilation error"
        );
    }

    #[test]
    fn unparseable_log_is_kept() {
        let log = "0(2) : error C1008: undefined variable\n";
        assert_eq!(annotate_compile_error(log, SOURCE), log);
    }

    #[test]
    fn lost_context_is_reported() {
        let gl = RecordingGl::new();
        gl.lose_context();
        let mut shader = Shader::<RecordingGl>::new(ShaderKind::Vertex, SOURCE);

        let err = unsafe { shader.get(&gl, None) }.unwrap_err();
        assert!(matches!(
            err,
            Error::ContextLost {
                context_lost: true,
                ..
            }
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let gl = RecordingGl::new();
        let mut shader = Shader::<RecordingGl>::new(ShaderKind::Vertex, SOURCE);
        unsafe {
            shader.get(&gl, None).unwrap();
            shader.remove(&gl);
            shader.remove(&gl);
        }
        assert_eq!(gl.count(|call| matches!(call, Call::DeleteShader(_))), 1);
    }
}
