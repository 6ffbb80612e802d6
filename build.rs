//! Build script: embeds the git hash and checks GPU toolkits before
//! whisper-rs-sys starts compiling.

use std::process::Command;

fn main() {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "cuda") {
        require_tool(
            "nvcc",
            &["--version"],
            "CUDA toolkit",
            "https://developer.nvidia.com/cuda-downloads",
        );
    }
    if cfg!(feature = "vulkan") {
        require_tool("vulkaninfo", &["--summary"], "Vulkan SDK", "https://vulkan.lunarg.com/");
    }
}

/// Abort the build with install hints when `tool` cannot be run.
fn require_tool(tool: &str, args: &[&str], what: &str, url: &str) {
    match Command::new(tool).args(args).output() {
        Ok(out) if out.status.success() => {
            if let Some(version) = first_line(&String::from_utf8_lossy(&out.stdout)) {
                println!("cargo::warning={} detected: {}", what, version);
            }
        }
        _ => panic!(
            "\n\n`{}` not found: {} is not installed.\n\
             Install: {}\n\
             Or build without the GPU feature: cargo build --release\n",
            tool, what, url
        ),
    }
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}
