/// Driver built and tagged in the symbol store when none is given.
pub const DEFAULT_DRIVER: &str = "xenbus";

/// Days a published symbol is kept before it becomes eligible for deletion.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Build counter, relative to the working directory.
pub const BUILD_NUMBER_FILE: &str = ".build_number";

/// Receives `GIT_REVISION` and is bundled into the output tarball.
pub const REVISION_FILE: &str = "revision";

/// Projects run through static driver verification, in order.
pub const VERIFIED_PROJECTS: [&str; 3] = ["xen", "xenfilt", "xenbus"];
