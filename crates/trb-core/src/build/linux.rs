//! Linux cross builds: aarch64, armhf and x86_64, each linked fully
//! static against the freshly built dependency chain.

use std::path::{Path, PathBuf};

use trb_schema::{Platform, ReleaseDescriptor, deps};

use crate::env::{BuildEnv, REPRODUCIBLE_GCC_CFLAGS};
use crate::process::ExternalCommand;
use crate::{paths, sources};

use super::{
    BuildError, InstallPrefix, OPENSSL_CONFIGURE_FLAGS, TOR_CONFIGURE_FLAGS, XZ_CONFIGURE_FLAGS,
    autogen, configure, extract_binary, io_err, jobs, make, pack_binary, strip_binary,
};

pub(crate) struct Arch {
    /// Artifact suffix (`tor_linux-<name>.zip`).
    pub name: &'static str,
    /// `-march=` value handed to OpenSSL's Configure.
    pub march: &'static str,
    /// Cross compiler exported as `CC`.
    pub cc: &'static str,
    /// OpenSSL Configure target.
    pub openssl_target: &'static str,
    /// `--host=` value for the autoconf builds.
    pub host: &'static str,
}

pub(crate) const ARCHES: [Arch; 3] = [
    Arch {
        name: "aarch64",
        march: "armv8-a",
        cc: "aarch64-linux-gnu-gcc",
        openssl_target: "linux-aarch64",
        host: "aarch64",
    },
    Arch {
        name: "armhf",
        march: "armv7-a",
        cc: "arm-linux-gnueabihf-gcc",
        openssl_target: "linux-armv4",
        host: "arm-linux-gnueabihf",
    },
    Arch {
        name: "x86_64",
        march: "x86-64",
        cc: "x86_64-linux-gnu-gcc",
        openssl_target: "linux-x86_64",
        host: "x86_64",
    },
];

/// Build every Linux arch in order, returning the per-arch zips.
///
/// # Errors
///
/// Returns the first [`BuildError`]; zips already produced stay on disk.
pub fn build(descriptor: &ReleaseDescriptor) -> Result<Vec<PathBuf>, BuildError> {
    let out_dir = paths::platform_output_dir(Platform::Linux);
    std::fs::create_dir_all(&out_dir).map_err(io_err(&out_dir))?;

    let mut zips = Vec::new();
    for arch in &ARCHES {
        zips.push(build_arch(arch, descriptor, &out_dir)?);
    }
    Ok(zips)
}

fn build_arch(
    arch: &Arch,
    descriptor: &ReleaseDescriptor,
    out_dir: &Path,
) -> Result<PathBuf, BuildError> {
    let zip_name = format!("tor_linux-{}.zip", arch.name);
    tracing::info!(zip = %zip_name, "building");

    let build_dir = paths::build_dir();
    // clean again per arch so build ordering cannot leak state
    sources::ensure_clean(&build_dir, descriptor)?;
    let prefix = InstallPrefix::create_fresh(&build_dir)?;

    let env = BuildEnv::for_release(descriptor)
        .with("LDFLAGS", format!("-L{}", prefix.lib().display()))
        .with("LD_LIBRARY_PATH", prefix.lib().display().to_string())
        .with(
            "CFLAGS",
            format!(
                "{REPRODUCIBLE_GCC_CFLAGS} -fPIC -I{}",
                prefix.include().display()
            ),
        )
        .with(
            "PKG_CONFIG_PATH",
            prefix.lib().join("pkgconfig").display().to_string(),
        )
        .with("LIBS", format!("-ldl -L{}", prefix.lib().display()))
        .with("CC", arch.cc);

    build_xz(&build_dir, &prefix, arch.host, &env)?;
    build_zstd(&build_dir, &prefix, &env)?;
    build_zlib(&build_dir, &prefix, &env)?;
    build_openssl(&build_dir, &prefix, arch, &env)?;
    build_libevent(&build_dir, &prefix, arch.host, &env)?;
    build_tor(&build_dir, &prefix, arch.host, &env)?;

    let binary = out_dir.join("tor");
    extract_binary(&build_dir.join(deps::TOR).join("src/app/tor"), &binary)?;
    strip_binary(&binary)?;

    let zip_path = out_dir.join(&zip_name);
    pack_binary(&binary, &zip_path, descriptor.timestamp)?;
    Ok(zip_path)
}

fn build_xz(
    build_dir: &Path,
    prefix: &InstallPrefix,
    host: &str,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::XZ);
    autogen(&dir, env)?;
    let mut args = vec![
        format!("--prefix={}", prefix.root().display()),
        format!("--host={host}"),
    ];
    args.extend(XZ_CONFIGURE_FLAGS.split_whitespace().map(String::from));
    configure(&dir, args, env)?;
    make(&dir, env).arg("-j").arg(jobs()).arg("install").run()?;
    Ok(())
}

fn build_zstd(
    build_dir: &Path,
    prefix: &InstallPrefix,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::ZSTD).join("lib");
    make(&dir, env)
        .arg("-j")
        .arg(jobs())
        .arg(format!("DESTDIR={}", prefix.root().display()))
        .arg("PREFIX=")
        .arg("install")
        .run()?;
    Ok(())
}

fn build_zlib(
    build_dir: &Path,
    prefix: &InstallPrefix,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::ZLIB);
    configure(&dir, [format!("--prefix={}", prefix.root().display())], env)?;
    make(&dir, env).arg("-j").arg(jobs()).arg("install").run()?;
    Ok(())
}

fn build_openssl(
    build_dir: &Path,
    prefix: &InstallPrefix,
    arch: &Arch,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::OPENSSL);
    let mut cmd = ExternalCommand::new("perl")
        .current_dir(&dir)
        .envs(env.vars())
        .arg("Configure")
        .arg(format!("--prefix={}", prefix.root().display()))
        .arg(format!("--openssldir={}", prefix.root().display()))
        .arg(format!("-march={}", arch.march))
        .arg(arch.openssl_target)
        .arg("shared")
        .args(OPENSSL_CONFIGURE_FLAGS.split_whitespace());
    if arch.host.ends_with("64") {
        cmd = cmd.arg("enable-ec_nistp_64_gcc_128");
    }
    cmd.run()?;

    make(&dir, env).arg("-j").arg(jobs()).run()?;
    make(&dir, env).arg("install_sw").run()?;
    Ok(())
}

fn build_libevent(
    build_dir: &Path,
    prefix: &InstallPrefix,
    host: &str,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::LIBEVENT);
    autogen(&dir, env)?;
    configure(
        &dir,
        [
            "--disable-shared".to_string(),
            format!("--prefix={}", prefix.root().display()),
            format!("--host={host}"),
        ],
        env,
    )?;
    make(&dir, env).arg("-j").arg(jobs()).run()?;
    make(&dir, env).arg("install").run()?;
    Ok(())
}

fn build_tor(
    build_dir: &Path,
    prefix: &InstallPrefix,
    host: &str,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::TOR);
    autogen(&dir, env)?;

    // FORTIFY_SOURCE needs optimization
    let env = env.clone().append("CFLAGS", "-O3");
    let p = prefix.root().display();
    let mut args = vec![
        format!("--host={host}"),
        format!("--prefix={p}"),
        "--enable-static-tor".to_string(),
        "--enable-lzma".to_string(),
        "--enable-zstd".to_string(),
        "--enable-static-zlib".to_string(),
        format!("--with-zlib-dir={p}"),
        "--enable-static-libevent".to_string(),
        format!("--with-libevent-dir={p}"),
        "--enable-static-openssl".to_string(),
        format!("--with-openssl-dir={p}"),
    ];
    args.extend(TOR_CONFIGURE_FLAGS.split_whitespace().map(String::from));
    configure(&dir, args, &env)?;
    make(&dir, &env).arg("-j").arg(jobs()).arg("install").run()?;
    Ok(())
}
