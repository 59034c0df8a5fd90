//! Windows cross build: x86_64 through mingw-w64.
//!
//! Differs from the Linux chain where the target forces it: zlib goes
//! through its own mingw makefile, OpenSSL links `-static-libgcc` with
//! no shared objects, the daemon needs `crypt32` and zstd is left out.

use std::path::{Path, PathBuf};

use trb_schema::{Platform, ReleaseDescriptor, deps};

use crate::env::{BuildEnv, REPRODUCIBLE_GCC_CFLAGS};
use crate::process::ExternalCommand;
use crate::{paths, sources};

use super::{
    BuildError, InstallPrefix, OPENSSL_CONFIGURE_FLAGS, TOR_CONFIGURE_FLAGS, XZ_CONFIGURE_FLAGS,
    autogen, configure, extract_binary, io_err, jobs, make, pack_binary, strip_binary,
};

pub(crate) const HOST: &str = "x86_64-w64-mingw32";
pub(crate) const CC: &str = "x86_64-w64-mingw32-gcc";

const ZIP_NAME: &str = "tor_windows-x86_64.zip";

/// Build the single Windows arch, returning its zip.
///
/// # Errors
///
/// Returns the first [`BuildError`].
pub fn build(descriptor: &ReleaseDescriptor) -> Result<Vec<PathBuf>, BuildError> {
    tracing::info!(zip = ZIP_NAME, "building");

    let out_dir = paths::platform_output_dir(Platform::Windows);
    std::fs::create_dir_all(&out_dir).map_err(io_err(&out_dir))?;

    let build_dir = paths::build_dir();
    // clean again per arch so build ordering cannot leak state
    sources::ensure_clean(&build_dir, descriptor)?;
    let prefix = InstallPrefix::create_fresh(&build_dir)?;

    let env = BuildEnv::for_release(descriptor)
        .with("LDFLAGS", format!("-L{}", prefix.root().display()))
        .with(
            "CFLAGS",
            format!(
                "{REPRODUCIBLE_GCC_CFLAGS} -fPIC -I{}",
                prefix.include().display()
            ),
        )
        // needed to find OpenSSL
        .with(
            "PKG_CONFIG_PATH",
            prefix.lib().join("pkgconfig").display().to_string(),
        )
        .with("CHOST", HOST);

    build_xz(&build_dir, &prefix, &env)?;
    build_zlib(&build_dir, &prefix, &env)?;

    // static link flags from OpenSSL onwards
    let env = env.with(
        "LDFLAGS",
        format!(
            "{REPRODUCIBLE_GCC_CFLAGS} -static -static-libgcc -L{}",
            prefix.root().display()
        ),
    );
    build_openssl(&build_dir, &prefix, &env)?;
    build_libevent(&build_dir, &prefix, &env)?;
    build_tor(&build_dir, &prefix, &env)?;

    let binary = out_dir.join("tor");
    extract_binary(&prefix.root().join("bin/tor.exe"), &binary)?;
    strip_binary(&binary)?;

    let zip_path = out_dir.join(ZIP_NAME);
    pack_binary(&binary, &zip_path, descriptor.timestamp)?;
    Ok(vec![zip_path])
}

fn build_xz(
    build_dir: &Path,
    prefix: &InstallPrefix,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::XZ);
    autogen(&dir, env)?;
    let mut args = vec![
        format!("--prefix={}", prefix.root().display()),
        format!("--host={HOST}"),
    ];
    args.extend(XZ_CONFIGURE_FLAGS.split_whitespace().map(String::from));
    configure(&dir, args, env)?;
    make(&dir, env).arg("-j").arg(jobs()).arg("install").run()?;
    Ok(())
}

fn build_zlib(
    build_dir: &Path,
    prefix: &InstallPrefix,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::ZLIB);
    let p = prefix.root().display();
    make(&dir, env)
        .arg("-j")
        .arg(jobs())
        .args(["-f", "win32/Makefile.gcc"])
        .arg(format!("BINARY_PATH={p}/bin"))
        .arg(format!("INCLUDE_PATH={p}/include"))
        .arg(format!("LIBRARY_PATH={p}/lib"))
        .arg("SHARED_MODE=1")
        .arg(format!("PREFIX={HOST}-"))
        .arg("install")
        .run()?;
    Ok(())
}

fn build_openssl(
    build_dir: &Path,
    prefix: &InstallPrefix,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::OPENSSL);
    // no -static: openssl's own Configure rejects it for mingw
    ExternalCommand::new("perl")
        .current_dir(&dir)
        .envs(env.vars())
        .arg("Configure")
        .arg("mingw64")
        .arg(format!("--cross-compile-prefix={HOST}-"))
        .arg(format!("--prefix={}", prefix.root().display()))
        .arg(format!("--openssldir={}", prefix.root().display()))
        .arg("-static-libgcc")
        .arg("no-shared")
        .arg("enable-ec_nistp_64_gcc_128")
        .args(OPENSSL_CONFIGURE_FLAGS.split_whitespace())
        .run()?;

    make(&dir, env).arg("-j").arg(jobs()).run()?;
    make(&dir, env).arg("install_sw").run()?;
    Ok(())
}

fn build_libevent(
    build_dir: &Path,
    prefix: &InstallPrefix,
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::LIBEVENT);
    autogen(&dir, env)?;
    configure(
        &dir,
        [
            format!("--host={HOST}"),
            "--disable-libevent-regress".to_string(),
            "--disable-samples".to_string(),
            "--disable-shared".to_string(),
            format!("--prefix={}", prefix.root().display()),
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
    env: &BuildEnv,
) -> Result<(), BuildError> {
    let dir = build_dir.join(deps::TOR);
    autogen(&dir, env)?;

    // FORTIFY_SOURCE needs optimization
    let env = env
        .clone()
        .append("CFLAGS", "-O3")
        .with("LIBS", "-lcrypt32");
    let p = prefix.root().display();
    let mut args = vec![
        format!("--host={HOST}"),
        format!("--prefix={p}"),
        "--enable-lzma".to_string(),
        "--enable-static-zlib".to_string(),
        format!("--with-zlib-dir={p}"),
        "--enable-static-libevent".to_string(),
        format!("--with-libevent-dir={p}"),
        "--enable-static-openssl".to_string(),
        format!("--with-openssl-dir={p}"),
    ];
    args.extend(TOR_CONFIGURE_FLAGS.split_whitespace().map(String::from));
    configure(&dir, args, &env)?;
    make(&dir, &env).arg("-j").arg(jobs()).run()?;
    make(&dir, &env).arg("install").run()?;
    Ok(())
}
