//! WGSL for every effect program.
//!
//! All programs live in one module. Uniforms arrive as a block of sixteen
//! `vec4` slots laid out by [`ProgramId::layout`]; the accessors at the top of
//! the source mirror those layouts.

use crate::stage::{ProgramId, TrailShader};

pub const EFFECTS_SHADER_SOURCE: &str = r#"
struct Params {
    slots: array<vec4<f32>, 16>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(1) @binding(0) var source_texture: texture_2d<f32>;
@group(1) @binding(1) var source_sampler: sampler;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) local: vec2<f32>,
};

fn projection() -> mat4x4<f32> {
    return mat4x4<f32>(params.slots[0], params.slots[1], params.slots[2], params.slots[3]);
}

fn scalar(i: u32) -> f32 {
    return params.slots[i].x;
}

fn hash(p: vec3<f32>) -> f32 {
    let q = fract(p * 0.3183099 + vec3<f32>(0.1, 0.2, 0.3));
    let r = q * 17.0;
    return fract(r.x * r.y * r.z * (r.x + r.y + r.z));
}

fn value_noise(p: vec3<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let u = f * f * (3.0 - 2.0 * f);
    let a = mix(hash(i + vec3<f32>(0.0, 0.0, 0.0)), hash(i + vec3<f32>(1.0, 0.0, 0.0)), u.x);
    let b = mix(hash(i + vec3<f32>(0.0, 1.0, 0.0)), hash(i + vec3<f32>(1.0, 1.0, 0.0)), u.x);
    let c = mix(hash(i + vec3<f32>(0.0, 0.0, 1.0)), hash(i + vec3<f32>(1.0, 0.0, 1.0)), u.x);
    let d = mix(hash(i + vec3<f32>(0.0, 1.0, 1.0)), hash(i + vec3<f32>(1.0, 1.0, 1.0)), u.x);
    return mix(mix(a, b, u.y), mix(c, d, u.y), u.z);
}

fn fbm(p: vec3<f32>) -> f32 {
    var sum = 0.0;
    var amp = 0.5;
    var q = p;
    for (var i = 0; i < 5; i = i + 1) {
        sum = sum + amp * value_noise(q);
        q = q * 2.03;
        amp = amp * 0.5;
    }
    return sum;
}

fn hsv2rgb(h: f32, s: f32, v: f32) -> vec3<f32> {
    let k = vec3<f32>(1.0, 2.0 / 3.0, 1.0 / 3.0);
    let p = abs(fract(vec3<f32>(h) + k) * 6.0 - vec3<f32>(3.0));
    return v * mix(vec3<f32>(1.0), clamp(p - vec3<f32>(1.0), vec3<f32>(0.0), vec3<f32>(1.0)), s);
}

// Full-target quad. `local` carries the projected pixel position.
@vertex
fn vs_fullscreen(@location(0) pos: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = vec4<f32>(pos * 2.0 - vec2<f32>(1.0), 0.0, 1.0);
    out.local = (projection() * vec4<f32>(pos, 0.0, 1.0)).xy;
    return out;
}

@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = projection() * vec4<f32>(pos, 0.0, 1.0);
    out.local = pos;
    return out;
}

// Background slots: eddy 4, time 5, brightness 6, hue 7, volatility 8.
@fragment
fn fs_nebula_background(in: VsOut) -> @location(0) vec4<f32> {
    let eddy = max(scalar(4u), 1.0);
    let time = scalar(5u);
    let brightness = scalar(6u);
    let hue = scalar(7u);
    let volatility = scalar(8u);
    let uv = in.local / eddy;
    let n = fbm(vec3<f32>(uv, time * 0.05));
    let swirl = fbm(vec3<f32>(uv * 2.0 + vec2<f32>(n), time * 0.08));
    let shift = volatility * 0.05 * sin(time * 0.7 + swirl * 6.2831);
    let col = hsv2rgb(hue + shift, 0.8, 1.0) * swirl * brightness;
    return vec4<f32>(col, 1.0);
}

// Overlay slots: horizon 4, eddy 5, time 6, brightness 7, hue 8, centre 9.
@fragment
fn fs_nebula_overlay(in: VsOut) -> @location(0) vec4<f32> {
    let horizon = scalar(4u);
    let eddy = max(scalar(5u), 1.0);
    let time = scalar(6u);
    let brightness = scalar(7u);
    let hue = scalar(8u);
    let centre = params.slots[9].xy;
    let dist = length(in.local - centre);
    let n = fbm(vec3<f32>(in.local / eddy, time * 0.05));
    let edge = horizon * (0.8 + 0.4 * n);
    let fog = smoothstep(edge * 0.75, edge, dist);
    let col = hsv2rgb(hue, 0.8, 1.0) * (0.3 + 0.7 * n) * brightness;
    return vec4<f32>(col * fog, fog);
}

// Puff slots: time 4, seed 5, colour 6.
@fragment
fn fs_nebula_puff(in: VsOut) -> @location(0) vec4<f32> {
    let time = scalar(4u);
    let seed = params.slots[5].xy;
    let colour = params.slots[6].xyz;
    let r = length(in.local);
    if (r > 1.0) {
        discard;
    }
    let n = fbm(vec3<f32>(in.local * 2.0 + seed, time * 0.1));
    let a = (1.0 - r) * (1.0 - r) * n;
    return vec4<f32>(colour * a, a);
}

// Trail slots: colour1 4, colour2 5, ages 6, thickness 7, length 8, seed 9,
// time 10, nebula colour 11.
fn trail_base(in: VsOut) -> vec4<f32> {
    let c1 = params.slots[4];
    let c2 = params.slots[5];
    let col = mix(c1, c2, in.local.x);
    let across = abs(in.local.y * 2.0 - 1.0);
    let edge = 1.0 - across * across;
    return vec4<f32>(col.rgb, col.a * edge);
}

fn premultiply(c: vec4<f32>) -> vec4<f32> {
    let a = clamp(c.a, 0.0, 1.0);
    return vec4<f32>(c.rgb * a, a);
}

@fragment
fn fs_trail_default(in: VsOut) -> @location(0) vec4<f32> {
    return premultiply(trail_base(in));
}

@fragment
fn fs_trail_pulse(in: VsOut) -> @location(0) vec4<f32> {
    let ages = params.slots[6].xy;
    let len = scalar(8u);
    let seed = scalar(9u);
    let age = mix(ages.x, ages.y, in.local.x);
    var c = trail_base(in);
    let pulse = 0.6 + 0.4 * sin(age * 40.0 + seed + in.local.x * len * 0.1);
    c.a = c.a * pulse;
    return premultiply(c);
}

@fragment
fn fs_trail_wave(in: VsOut) -> @location(0) vec4<f32> {
    let ages = params.slots[6].xy;
    let seed = scalar(9u);
    let time = scalar(10u);
    let age = mix(ages.x, ages.y, in.local.x);
    let offset = 0.25 * sin(age * 25.0 + time * 3.0 + seed);
    let across = abs((in.local.y + offset) * 2.0 - 1.0);
    var c = mix(params.slots[4], params.slots[5], in.local.x);
    c.a = c.a * max(1.0 - across * across, 0.0);
    return premultiply(c);
}

@fragment
fn fs_trail_flame(in: VsOut) -> @location(0) vec4<f32> {
    let ages = params.slots[6].xy;
    let thick = max(scalar(7u), 1.0);
    let seed = scalar(9u);
    let time = scalar(10u);
    let age = mix(ages.x, ages.y, in.local.x);
    let n = fbm(vec3<f32>(age * 8.0 + seed, in.local.y * thick * 0.1, time * 2.0));
    var c = trail_base(in);
    c.a = c.a * (0.4 + 0.8 * n);
    c = vec4<f32>(c.rgb + vec3<f32>(0.3, 0.15, 0.0) * n, c.a);
    return premultiply(c);
}

@fragment
fn fs_trail_nebula(in: VsOut) -> @location(0) vec4<f32> {
    let nebula = params.slots[11].xyz;
    var c = trail_base(in);
    c = vec4<f32>(mix(c.rgb, nebula, 0.5), c.a);
    return premultiply(c);
}

// Blit slot: colour 4.
@fragment
fn fs_blit(in: VsOut) -> @location(0) vec4<f32> {
    let uv = vec2<f32>(in.local.x, 1.0 - in.local.y);
    return textureSample(source_texture, source_sampler, uv) * params.slots[4];
}
"#;

/// Vertex and fragment entry points of `program`.
pub fn entry_points(program: ProgramId) -> (&'static str, &'static str) {
    match program {
        ProgramId::NebulaBackground => ("vs_fullscreen", "fs_nebula_background"),
        ProgramId::NebulaOverlay => ("vs_fullscreen", "fs_nebula_overlay"),
        ProgramId::NebulaPuff => ("vs_main", "fs_nebula_puff"),
        ProgramId::TextureBlit => ("vs_main", "fs_blit"),
        ProgramId::Trail(shader) => (
            "vs_main",
            match shader {
                TrailShader::Default => "fs_trail_default",
                TrailShader::Pulse => "fs_trail_pulse",
                TrailShader::Wave => "fs_trail_wave",
                TrailShader::Flame => "fs_trail_flame",
                TrailShader::Nebula => "fs_trail_nebula",
            },
        ),
    }
}

/// Every program the backend builds a pipeline for.
pub fn all_programs() -> Vec<ProgramId> {
    let mut programs = vec![
        ProgramId::NebulaBackground,
        ProgramId::NebulaOverlay,
        ProgramId::NebulaPuff,
        ProgramId::TextureBlit,
    ];
    programs.extend(TrailShader::ALL.iter().map(|s| ProgramId::Trail(*s)));
    programs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Uniform;

    #[test]
    fn test_every_entry_point_exists_in_source() {
        for program in all_programs() {
            let (vs, fs) = entry_points(program);
            assert!(EFFECTS_SHADER_SOURCE.contains(&format!("fn {vs}(")), "{vs}");
            assert!(EFFECTS_SHADER_SOURCE.contains(&format!("fn {fs}(")), "{fs}");
        }
    }

    #[test]
    fn test_fullscreen_programs_use_fullscreen_vertex_stage() {
        assert_eq!(entry_points(ProgramId::NebulaBackground).0, "vs_fullscreen");
        assert_eq!(entry_points(ProgramId::NebulaOverlay).0, "vs_fullscreen");
        assert_eq!(entry_points(ProgramId::NebulaPuff).0, "vs_main");
    }

    #[test]
    fn test_shader_slot_indices_match_layouts() {
        // Slots after the projection matrix start at 4.
        let overlay = ProgramId::NebulaOverlay.layout();
        assert_eq!(overlay.iter().position(|u| *u == Uniform::Center), Some(6));
        let trail = ProgramId::Trail(TrailShader::Default).layout();
        assert_eq!(trail.iter().position(|u| *u == Uniform::NebulaColor), Some(8));
    }

    #[test]
    fn test_program_list_covers_every_trail_shader() {
        let programs = all_programs();
        assert_eq!(programs.len(), 9);
        for shader in TrailShader::ALL {
            assert!(programs.contains(&ProgramId::Trail(shader)));
        }
    }
}
