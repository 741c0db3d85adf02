//! Built-in mission catalog.

use database::{mission, Category, Difficulty, Mission};
use tracing::info;

use crate::engine::Engine;
use crate::error::Result;

use Category::*;
use Difficulty::*;

const DEFAULT_MISSIONS: &[(&str, Category, Difficulty, &str, &str)] = &[
    ("vig-e1", Vigilancia, Easy, "Ponto fixo", "Fotografe a mesma janela em dois horarios diferentes do dia."),
    ("vig-e2", Vigilancia, Easy, "Relogio publico", "Registre um relogio de rua marcando a hora exata."),
    ("vig-e3", Vigilancia, Easy, "Rota do onibus", "Fotografe o letreiro de um onibus que passa perto de voce."),
    ("vig-m1", Vigilancia, Medium, "Placa suspeita", "Registre uma placa de carro com tres digitos repetidos."),
    ("vig-m2", Vigilancia, Medium, "Troca de turno", "Fotografe um estabelecimento no momento em que abre as portas."),
    ("vig-m3", Vigilancia, Medium, "Cao de guarda", "Registre um cachorro vigiando um portao."),
    ("vig-h1", Vigilancia, Hard, "Tocaia", "Fotografe o mesmo cruzamento de hora em hora por tres horas."),
    ("vig-h2", Vigilancia, Hard, "Alvo em movimento", "Registre um ciclista em movimento sem borrar a imagem."),
    ("vig-h3", Vigilancia, Hard, "Observatorio", "Fotografe a cidade a partir do ponto mais alto que conseguir acessar."),
    ("col-e1", Coleta, Easy, "Recibo", "Traga o recibo de uma compra feita hoje."),
    ("col-e2", Coleta, Easy, "Folha caida", "Colete uma folha com pelo menos tres cores."),
    ("col-e3", Coleta, Easy, "Tampinha", "Encontre uma tampinha de garrafa de cor incomum."),
    ("col-m1", Coleta, Medium, "Cardapio", "Consiga um cardapio impresso de um restaurante."),
    ("col-m2", Coleta, Medium, "Mapa local", "Obtenha um mapa ou folheto turistico da sua regiao."),
    ("col-m3", Coleta, Medium, "Moeda antiga", "Encontre uma moeda cunhada ha mais de dez anos."),
    ("col-h1", Coleta, Hard, "Assinatura", "Consiga o autografo de alguem que trabalha atendendo ao publico."),
    ("col-h2", Coleta, Hard, "Carimbo oficial", "Traga um papel com carimbo de alguma instituicao."),
    ("col-h3", Coleta, Hard, "Colecao", "Reuna cinco objetos da mesma cor em uma unica foto."),
    ("inf-e1", Infiltracao, Easy, "Fila", "Fotografe-se discretamente em uma fila."),
    ("inf-e2", Infiltracao, Easy, "Cliente comum", "Peca um cafe usando um nome de codigo."),
    ("inf-e3", Infiltracao, Easy, "Biblioteca", "Registre a estante de uma biblioteca ou livraria."),
    ("inf-m1", Infiltracao, Medium, "Evento aberto", "Participe de um evento publico e registre a entrada."),
    ("inf-m2", Infiltracao, Medium, "Bastidores", "Fotografe uma area de servico vista de um local publico."),
    ("inf-m3", Infiltracao, Medium, "Reuniao", "Registre uma reuniao de grupo em que voce esteja presente."),
    ("inf-h1", Infiltracao, Hard, "Cracha", "Consiga um cracha de visitante e fotografe-o."),
    ("inf-h2", Infiltracao, Hard, "Aula surpresa", "Assista a uma aula ou palestra aberta e registre o quadro."),
    ("inf-h3", Infiltracao, Hard, "Cozinha", "Fotografe a cozinha de um restaurante com autorizacao."),
    ("dis-e1", Disfarce, Easy, "Oculos escuros", "Tire uma selfie de oculos escuros em local fechado."),
    ("dis-e2", Disfarce, Easy, "Chapeu", "Use um chapeu que nao e seu e registre."),
    ("dis-e3", Disfarce, Easy, "Cor unica", "Vista-se com uma unica cor da cabeca aos pes."),
    ("dis-m1", Disfarce, Medium, "Turista", "Passe-se por turista e peca informacoes na sua propria cidade."),
    ("dis-m2", Disfarce, Medium, "Bigode falso", "Saia de casa com um bigode falso e registre."),
    ("dis-m3", Disfarce, Medium, "Uniforme", "Registre-se vestindo algo que pareca um uniforme."),
    ("dis-h1", Disfarce, Hard, "Irreconhecivel", "Fotografe-se de forma que um amigo nao te reconheca."),
    ("dis-h2", Disfarce, Hard, "Sotaque", "Grave uma conversa curta usando um sotaque diferente."),
    ("dis-h3", Disfarce, Hard, "Personagem", "Passe uma hora em publico caracterizado como um personagem."),
    ("rec-e1", Reconhecimento, Easy, "Saida de emergencia", "Fotografe a placa de saida de emergencia mais proxima."),
    ("rec-e2", Reconhecimento, Easy, "Numero da casa", "Registre um numero de casa escrito de forma criativa."),
    ("rec-e3", Reconhecimento, Easy, "Ponto de referencia", "Fotografe o monumento mais proximo de voce."),
    ("rec-m1", Reconhecimento, Medium, "Beco", "Registre uma rua sem saida do seu bairro."),
    ("rec-m2", Reconhecimento, Medium, "Grafite", "Encontre e fotografe um grafite com uma mensagem."),
    ("rec-m3", Reconhecimento, Medium, "Planta baixa", "Fotografe o mapa de um shopping ou estacao."),
    ("rec-h1", Reconhecimento, Hard, "Perimetro", "Registre os quatro cantos de um quarteirao."),
    ("rec-h2", Reconhecimento, Hard, "Marco zero", "Encontre o marco zero ou a praca central da sua cidade."),
    ("rec-h3", Reconhecimento, Hard, "Nascer do sol", "Registre o nascer do sol de um ponto elevado."),
];

/// The missions shipped with the game.
pub fn default_catalog() -> Vec<Mission> {
    DEFAULT_MISSIONS
        .iter()
        .map(|&(id, category, difficulty, title, objective)| Mission {
            id: id.to_string(),
            category,
            title: title.to_string(),
            objective: objective.to_string(),
            difficulty,
            points: difficulty.points(),
        })
        .collect()
}

impl Engine {
    /// Load the built-in catalog. Existing missions are left untouched.
    ///
    /// Returns how many missions were added.
    pub async fn seed_default_catalog(&self) -> Result<u64> {
        let inserted = mission::insert_missions(self.db.pool(), &default_catalog()).await?;
        if inserted > 0 {
            let total = mission::count_missions(self.db.pool()).await?;
            info!(inserted, total, "Seeded mission catalog");
        }
        Ok(inserted)
    }
}
