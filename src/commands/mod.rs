pub(crate) mod dist_install;
pub(crate) mod new;
pub(crate) mod secret_set;
pub(crate) mod set_exec_name;
pub(crate) mod set_remote;
pub(crate) mod timer;
pub(crate) mod update;
