//! Route table of the clinic application.

use clinica_core::{DomainResult, RoleTag};

use crate::route::{RouteDescriptor, RouteTable};

/// The application's routes, in resolution order.
///
/// User administration is restricted to directors; every other screen only
/// needs a signed-in user. The catch-all "not found" page is last.
pub fn clinic_routes() -> DomainResult<RouteTable> {
    let director_only = [RoleTag::Director];

    let routes = vec![
        RouteDescriptor::new("login", "/auth/login")?.public(),
        RouteDescriptor::new("logout", "/logout")?.public(),
        RouteDescriptor::new("recuperarContrasena", "/recuperar")?.public(),
        RouteDescriptor::new("resetContrasena", "/reset/:token")?.public(),
        RouteDescriptor::new("dashboard", "/")?,
        RouteDescriptor::new("pacientes", "/pacientes")?,
        RouteDescriptor::new("registrarPaciente", "/pacientes/registrar")?,
        RouteDescriptor::new("editarPaciente", "/pacientes/:id/editar")?,
        RouteDescriptor::new("historias", "/historias")?,
        RouteDescriptor::new("historiaPaciente", "/pacientes/:id/historias")?,
        RouteDescriptor::new("evolucionDetalle", "/pacientes/:id/evolucion/:evoId")?,
        RouteDescriptor::new("turnos", "/turnos")?,
        RouteDescriptor::new("nuevoTurno", "/turnos/nuevo")?,
        RouteDescriptor::new("usuarios", "/usuarios")?.allow_roles(director_only),
        RouteDescriptor::new("crearUsuario", "/usuarios/crear")?.allow_roles(director_only),
        RouteDescriptor::new("usuariosInactivos", "/usuarios/inactivos")?.allow_roles(director_only),
        RouteDescriptor::new("editarUsuario", "/usuarios/:id/editar")?.allow_roles(director_only),
        RouteDescriptor::new("disponibilidadProfesional", "/disponibilidad")?,
        RouteDescriptor::new("gruposProfesionales", "/grupos")?,
        RouteDescriptor::new("crearGrupo", "/grupos/crear")?,
        RouteDescriptor::new("calendarioGrupo", "/calendario-grupo/:grupoId")?,
        RouteDescriptor::new("blockchainVerificar", "/blockchain/verificar")?,
        RouteDescriptor::new("notfound", "/:pathMatch(.*)*")?,
    ];

    Ok(RouteTable::new(routes))
}
