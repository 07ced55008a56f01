//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Afterglow Configuration
# Only override what you want to change -- missing fields use defaults.

[render]
# msaa_samples = 4        # 1, 2, 4, 8 (clamped to GPU support)
# clear_color = "#cccccc" # used when the background effect is off
# final_filter = "copy"   # "copy" | "fxaa"
# effect_order = ["background", "ssao", "ssr", "bloom", "tone_mapping", "vignette"]

[temporal]
# enabled = true
# budget = 30             # 1-256 jittered samples per convergence

[effects.background]
# enabled = false
# color = "#000000"

[effects.bloom]
# enabled = false
# threshold = 0.7         # 0.0-1.0
# intensity = 1.0         # 0.0-10.0
# radius = 2.0            # 0.0-10.0
# kernel_size = 13        # 3-25, odd

[effects.ssao]
# enabled = false
# kernel_size = 32        # 1-64
# radius = 10.0
# bias = 0.2
# intensity = 1.0
# power = 1.0
# blur_size = 2           # 0-8
# depth_range = 1.0

[effects.ssr]
# enabled = false
# max_ray_distance = 200.0
# pixel_stride_z_cutoff = 50.0
# z_thickness_threshold = 1.0
# blur_size = 2           # 0-8

[effects.tone_mapping]
# enabled = false
# curve = "linear"        # "linear" | "reinhard" | "filmic"
# exposure = 0.0          # -10.0-10.0 stops
# brightness = 0.0        # -1.0-1.0
# contrast = 1.0          # 0.0-4.0
# saturation = 1.0        # 0.0-4.0

[effects.vignette]
# enabled = false
# offset = 1.0            # 0.0-4.0
# darkness = 1.0          # 0.0-1.0

[logging]
# level = "info"          # trace, debug, info, warn, error
"##
    .to_string()
}
